//! 外部播放器（骨骼动画引擎）的边界契约

use super::error::PlaybackError;
use super::types::{EMPTY_CLIP, TrackEntryId, TrackIndex};

/// 轨道条目快照
///
/// 描述某条轨道上正在（或排队）播放的内容。状态机在每次进入、更新、
/// 退出时都会把最新的快照交给片段状态。
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEntry {
    pub id: TrackEntryId,
    pub track_index: TrackIndex,
    /// 片段名，空动画为 [`EMPTY_CLIP`]
    pub clip: String,
    pub looped: bool,
    pub delay: f32,
    /// 已播放时间（秒）
    pub track_time: f32,
    /// 片段时长（秒）
    pub duration: f32,
    pub mix_duration: f32,
    pub time_scale: f32,
    pub alpha: f32,
}

impl TrackEntry {
    pub fn is_empty_animation(&self) -> bool {
        self.clip == EMPTY_CLIP
    }

    /// 非循环片段已播放到末尾
    pub fn is_complete(&self) -> bool {
        !self.looped && self.track_time >= self.duration
    }
}

/// 播放器发出的通知
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotification {
    Start(TrackEntry),
    Interrupt(TrackEntry),
    End(TrackEntry),
    /// 片段时间线上的命名事件
    Event { entry: TrackEntry, name: String },
}

impl PlaybackNotification {
    pub fn entry(&self) -> &TrackEntry {
        match self {
            Self::Start(entry) | Self::Interrupt(entry) | Self::End(entry) => entry,
            Self::Event { entry, .. } => entry,
        }
    }
}

/// 播放选项
///
/// 提供 `time_scale` 或 `alpha` 时，会同时记为该片段后续条目的覆盖值。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayOptions {
    pub mix_duration: Option<f32>,
    pub time_scale: Option<f32>,
    pub alpha: Option<f32>,
}

impl PlayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mix_duration(mut self, mix_duration: f32) -> Self {
        self.mix_duration = Some(mix_duration);
        self
    }

    pub fn time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = Some(time_scale);
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }
}

/// 骨骼动画播放器
///
/// 播放器在内部缓存通知，由状态机通过 [`AnimationPlayer::drain_notifications`]
/// 按发生顺序取走。
pub trait AnimationPlayer {
    /// 绑定的骨骼数据中定义的全部片段名
    fn clip_names(&self) -> Vec<String>;

    /// 立即在轨道上播放片段，打断当前条目
    fn set_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
    ) -> Result<TrackEntry, PlaybackError>;

    /// 在轨道上排队播放片段，`delay` 秒后开始
    fn add_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        delay: f32,
    ) -> Result<TrackEntry, PlaybackError>;

    fn set_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: f32,
    ) -> Result<TrackEntry, PlaybackError>;

    fn add_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: f32,
        delay: f32,
    ) -> Result<TrackEntry, PlaybackError>;

    /// 轨道上的当前条目
    fn current(&self, track: TrackIndex) -> Option<TrackEntry>;

    /// 所有存活轨道的当前条目，按轨道索引升序
    fn tracks(&self) -> Vec<TrackEntry>;

    fn set_mix_duration(&mut self, entry: TrackEntryId, mix_duration: f32);

    fn set_time_scale(&mut self, entry: TrackEntryId, time_scale: f32);

    fn set_alpha(&mut self, entry: TrackEntryId, alpha: f32);

    /// 清空轨道（当前条目结束，队列丢弃）
    fn clear_track(&mut self, track: TrackIndex);

    /// 推进播放时间
    fn advance(&mut self, delta_time: f32);

    /// 取走自上次调用以来产生的通知
    fn drain_notifications(&mut self) -> Vec<PlaybackNotification>;
}
