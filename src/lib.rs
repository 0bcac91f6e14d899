//! Spine-FSM: 骨骼动画之上的状态机
//!
//! 状态分为全局、条件、片段三类，由布尔条件和播放器的轨道通知驱动
//! 进入与退出，每帧按固定顺序更新。

// 导出核心模块
pub mod core;
pub mod utils;
pub mod examples;

// 重新导出常用类型，方便用户使用
pub use crate::core::{
    AnimationPlayer, ContextBehavior, ContextFsm, ContextState, FsmConfig, FsmError,
    LogCategories, PlayOptions, PlaybackError, PlaybackNotification, Properties, Result, Shared,
    SpineFsm, StateBehavior, StateHandle, StateScope, TrackEntry,
};
pub use utils::scripted_player::ScriptedPlayer;
