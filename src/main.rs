//! Spine-FSM 示例程序
//!
//! 日志类别由 `SPINE_FSM_LOGGING` 控制，输出级别由 `RUST_LOG` 控制。

use envconfig::Envconfig;
use spine_fsm::examples::player_movement;
use spine_fsm::{FsmConfig, FsmError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), FsmError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = FsmConfig::init_from_env()?;
    tracing::info!(logging = %config.logging, "running player movement example");

    let report = player_movement::run_player_movement_example(config)?;
    tracing::info!(
        frames = report.frames,
        footsteps = report.footsteps,
        final_clip = ?report.final_clip,
        "all examples finished"
    );
    Ok(())
}
