//! 类型别名和基础类型定义

/// 播放轨道索引
pub type TrackIndex = usize;

/// 轨道条目ID（由播放器分配）
pub type TrackEntryId = u64;

/// 状态机实例ID
pub type FsmId = u64;

/// 事件订阅ID
pub type SubscriptionId = u64;

/// 全局状态使用的键
pub const GLOBAL_KEY: &str = "global";

/// 空动画条目的片段名
pub const EMPTY_CLIP: &str = "<empty>";
