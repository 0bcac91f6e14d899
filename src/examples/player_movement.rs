//! 玩家移动示例
//! 演示如何用带上下文的状态机驱动 idle/walk 两个片段

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::{
    ContextBehavior, ContextFsm, ContextState, FsmConfig, PlayOptions, Result, Shared,
    StateHandle, StateScope,
};
use crate::utils::scripted_player::ScriptedPlayer;

/// 每帧时长
pub const FRAME: f32 = 0.016;

/// 玩家数据，所有状态共享
#[derive(Debug, Default)]
pub struct PlayerData {
    pub speed: f32,
    pub distance: f32,
    pub footsteps: u32,
    /// 行走状态的进入/退出记录
    pub transitions: Vec<String>,
}

/// 示例运行结果
#[derive(Debug, Clone, PartialEq)]
pub struct MovementReport {
    pub frames: u32,
    pub distance: f32,
    pub footsteps: u32,
    pub transitions: Vec<String>,
    pub final_clip: Option<String>,
}

/// 根据速度切换 idle/moving 条件
struct Locomotion;

impl ContextBehavior<PlayerData> for Locomotion {
    fn on_update(
        &mut self,
        data: &Shared<PlayerData>,
        scope: &mut StateScope<'_>,
        _delta_time: f32,
    ) -> Result<()> {
        let speed = data.borrow().speed;
        let fsm = scope.fsm();
        fsm.set_float("speed", speed)?;
        if speed > 0.0 && !fsm.get_condition("moving") {
            fsm.swap_condition("idle", "moving")?;
        } else if speed <= 0.0 && !fsm.get_condition("idle") {
            fsm.swap_condition("moving", "idle")?;
        }
        Ok(())
    }
}

/// 条件成立时在 0 号轨道上播放片段
struct PlayClip {
    clip: &'static str,
}

impl ContextBehavior<PlayerData> for PlayClip {
    fn on_enter(&mut self, _data: &Shared<PlayerData>, scope: &mut StateScope<'_>) -> Result<()> {
        scope.log(format_args!("play {}", self.clip));
        scope
            .fsm()
            .set_animation_if_different(0, self.clip, true, PlayOptions::new().mix_duration(0.1))?;
        Ok(())
    }
}

/// 绑定 walk 片段：行走时累计移动距离
struct Walking;

impl ContextBehavior<PlayerData> for Walking {
    fn on_enter(&mut self, data: &Shared<PlayerData>, _scope: &mut StateScope<'_>) -> Result<()> {
        data.borrow_mut().transitions.push("walk:enter".to_string());
        Ok(())
    }

    fn on_update(
        &mut self,
        data: &Shared<PlayerData>,
        scope: &mut StateScope<'_>,
        delta_time: f32,
    ) -> Result<()> {
        let track_time = scope.track()?.track_time;
        let mut data = data.borrow_mut();
        let speed = data.speed;
        data.distance += speed * delta_time;
        scope.log(format_args!("walked {:.2} (t = {:.2})", data.distance, track_time));
        Ok(())
    }

    fn on_exit(&mut self, data: &Shared<PlayerData>, _scope: &mut StateScope<'_>) -> Result<()> {
        data.borrow_mut().transitions.push("walk:exit".to_string());
        Ok(())
    }
}

/// 创建玩家移动状态机示例
pub fn create_player_movement_example(
    config: FsmConfig,
) -> Result<(ContextFsm<PlayerData>, Shared<PlayerData>)> {
    let player = ScriptedPlayer::new()
        .with_clip("idle", 1.0)
        .with_clip("walk", 0.8)
        .with_event("walk", 0.2, "footstep")
        .with_event("walk", 0.6, "footstep");

    let data = Rc::new(RefCell::new(PlayerData::default()));
    let mut fsm = ContextFsm::with_config(Rc::clone(&data), "hero", player, config);

    fsm.add_global_state(&StateHandle::new(ContextState::new(Locomotion)))?;
    fsm.add_conditional_state(
        "idle",
        &StateHandle::new(ContextState::new(PlayClip { clip: "idle" })),
    )?;
    fsm.add_conditional_state(
        "moving",
        &StateHandle::new(ContextState::new(PlayClip { clip: "walk" })),
    )?;
    fsm.add_state("walk", &StateHandle::new(ContextState::new(Walking)))?;

    let counter = Rc::clone(&data);
    fsm.subscribe_to_event("footstep", move || counter.borrow_mut().footsteps += 1)?;

    fsm.set_condition("idle", true)?;
    Ok((fsm, data))
}

/// 运行玩家移动示例：站立 60 帧，行走 120 帧，再站立 60 帧
pub fn run_player_movement_example(config: FsmConfig) -> Result<MovementReport> {
    let (mut fsm, data) = create_player_movement_example(config)?;

    let frames = 240;
    for frame in 0..frames {
        data.borrow_mut().speed = if (60..180).contains(&frame) { 2.0 } else { 0.0 };
        fsm.player_mut().advance(FRAME);
        fsm.update(FRAME)?;
    }

    let final_clip = fsm.get_current(0).map(|entry| entry.clip);
    fsm.clear_all()?;

    let data = data.borrow();
    tracing::info!(
        distance = data.distance,
        footsteps = data.footsteps,
        "player movement example finished"
    );
    Ok(MovementReport {
        frames,
        distance: data.distance,
        footsteps: data.footsteps,
        transitions: data.transitions.clone(),
        final_clip,
    })
}
