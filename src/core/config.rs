//! 状态机配置

use envconfig::Envconfig;

use super::logging::LogCategories;

/// 状态机配置，可以从环境变量加载
#[derive(Envconfig, Debug, Clone, PartialEq)]
pub struct FsmConfig {
    /// 日志类别掩码，例如 `state_setup,animation_playback` 或 `all`
    #[envconfig(from = "SPINE_FSM_LOGGING", default = "none")]
    pub logging: LogCategories,

    /// `set_empty_animation` 未指定混合时长时使用的默认值（秒）
    #[envconfig(from = "SPINE_FSM_EMPTY_MIX_DURATION", default = "0.25")]
    pub empty_mix_duration: f32,
}

impl FsmConfig {
    pub fn with_logging(mut self, logging: LogCategories) -> Self {
        self.logging = logging;
        self
    }
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            logging: LogCategories::NONE,
            empty_mix_duration: 0.25,
        }
    }
}
