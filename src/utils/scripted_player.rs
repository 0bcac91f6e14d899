//! 脚本化播放器
//!
//! [`AnimationPlayer`] 的内存实现：片段只有时长和时间线事件，没有任何
//! 姿态计算。用于示例程序和测试，也可以作为接入真实引擎时的参照。

use std::collections::{BTreeMap, VecDeque};

use crate::core::error::PlaybackError;
use crate::core::player::{AnimationPlayer, PlaybackNotification, TrackEntry};
use crate::core::types::{EMPTY_CLIP, TrackEntryId, TrackIndex};

#[derive(Debug, Clone, Default)]
struct Clip {
    duration: f32,
    /// (时间, 事件名)，按时间排序
    events: Vec<(f32, String)>,
}

#[derive(Debug, Default)]
struct Track {
    current: Option<TrackEntry>,
    queue: VecDeque<TrackEntry>,
}

#[derive(Debug)]
pub struct ScriptedPlayer {
    clips: BTreeMap<String, Clip>,
    tracks: BTreeMap<TrackIndex, Track>,
    notifications: Vec<PlaybackNotification>,
    next_id: TrackEntryId,
    report_track_end: bool,
}

impl Default for ScriptedPlayer {
    fn default() -> Self {
        Self {
            clips: BTreeMap::new(),
            tracks: BTreeMap::new(),
            notifications: Vec::new(),
            next_id: 0,
            report_track_end: true,
        }
    }
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 定义片段
    pub fn with_clip(mut self, name: &str, duration: f32) -> Self {
        self.clips.entry(name.to_string()).or_default().duration = duration.max(0.0);
        self
    }

    /// 在片段时间线上放置一个事件；片段未定义时按事件时间定义它
    pub fn with_event(mut self, clip: &str, time: f32, name: &str) -> Self {
        let clip = self.clips.entry(clip.to_string()).or_insert_with(|| Clip {
            duration: time.max(0.0),
            events: Vec::new(),
        });
        clip.events.push((time.max(0.0), name.to_string()));
        clip.events.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }

    /// 轨道被替换或清空时不发出 interrupt/end，模拟只会静默清轨的引擎
    pub fn without_end_notifications(mut self) -> Self {
        self.report_track_end = false;
        self
    }

    fn new_entry(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        delay: f32,
        mix_duration: f32,
    ) -> Result<TrackEntry, PlaybackError> {
        if !delay.is_finite() || !mix_duration.is_finite() {
            return Err(PlaybackError::InvalidValue {
                message: format!("delay {delay} / mix duration {mix_duration} on track {track}"),
            });
        }
        let duration = if clip == EMPTY_CLIP {
            0.0
        } else {
            self.clips
                .get(clip)
                .map(|c| c.duration)
                .ok_or_else(|| PlaybackError::UnknownAnimation {
                    name: clip.to_string(),
                })?
        };
        self.next_id += 1;
        Ok(TrackEntry {
            id: self.next_id,
            track_index: track,
            clip: clip.to_string(),
            looped,
            delay,
            track_time: 0.0,
            duration,
            mix_duration,
            time_scale: 1.0,
            alpha: 1.0,
        })
    }

    fn replace(&mut self, entry: TrackEntry) {
        let track = self.tracks.entry(entry.track_index).or_default();
        track.queue.clear();
        let previous = track.current.replace(entry.clone());
        if let Some(previous) = previous {
            self.finish(previous, true);
        }
        self.notifications.push(PlaybackNotification::Start(entry));
    }

    fn enqueue(&mut self, entry: TrackEntry) {
        let track = self.tracks.entry(entry.track_index).or_default();
        if track.current.is_none() && track.queue.is_empty() {
            track.current = Some(entry.clone());
            self.notifications.push(PlaybackNotification::Start(entry));
        } else {
            track.queue.push_back(entry);
        }
    }

    fn finish(&mut self, entry: TrackEntry, interrupted: bool) {
        if !self.report_track_end {
            return;
        }
        if interrupted {
            self.notifications
                .push(PlaybackNotification::Interrupt(entry.clone()));
        }
        self.notifications.push(PlaybackNotification::End(entry));
    }

    fn entry_mut(&mut self, id: TrackEntryId) -> Option<&mut TrackEntry> {
        self.tracks
            .values_mut()
            .flat_map(|track| track.current.iter_mut().chain(track.queue.iter_mut()))
            .find(|entry| entry.id == id)
    }

    fn advance_track(&mut self, index: TrackIndex, delta_time: f32) {
        let Some(track) = self.tracks.get_mut(&index) else {
            return;
        };
        let Some(current) = track.current.as_mut() else {
            return;
        };

        let t0 = current.track_time;
        let t1 = t0 + delta_time * current.time_scale;
        current.track_time = t1;
        let snapshot = current.clone();

        if let Some(clip) = self.clips.get(&snapshot.clip) {
            for name in crossed_events(clip, snapshot.looped, t0, t1) {
                self.notifications.push(PlaybackNotification::Event {
                    entry: snapshot.clone(),
                    name,
                });
            }
        }

        let Some(track) = self.tracks.get_mut(&index) else {
            return;
        };
        let ready = track.queue.front().is_some_and(|next| {
            if next.delay > 0.0 {
                snapshot.track_time >= next.delay
            } else if snapshot.looped {
                snapshot.track_time >= snapshot.duration
            } else {
                snapshot.is_complete()
            }
        });

        if ready {
            if let Some(next) = track.queue.pop_front() {
                track.current = Some(next.clone());
                self.finish(snapshot, true);
                self.notifications.push(PlaybackNotification::Start(next));
            }
        } else if snapshot.is_empty_animation()
            && track.queue.is_empty()
            && snapshot.track_time >= snapshot.mix_duration
        {
            // 空动画混合结束后轨道清空
            self.tracks.remove(&index);
            self.finish(snapshot, false);
        }
    }
}

fn crossed_events(clip: &Clip, looped: bool, t0: f32, t1: f32) -> Vec<String> {
    let mut fired = Vec::new();
    if t1 <= t0 {
        return fired;
    }
    if looped && clip.duration > 0.0 {
        let first = (t0 / clip.duration).floor() as i64;
        let last = (t1 / clip.duration).floor() as i64;
        for cycle in first..=last {
            let base = cycle as f32 * clip.duration;
            for (time, name) in &clip.events {
                let at = base + time;
                if at >= t0 && at < t1 {
                    fired.push(name.clone());
                }
            }
        }
    } else {
        for (time, name) in &clip.events {
            if *time >= t0 && *time < t1 {
                fired.push(name.clone());
            }
        }
    }
    fired
}

impl AnimationPlayer for ScriptedPlayer {
    fn clip_names(&self) -> Vec<String> {
        self.clips.keys().cloned().collect()
    }

    fn set_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
    ) -> Result<TrackEntry, PlaybackError> {
        let entry = self.new_entry(track, clip, looped, 0.0, 0.0)?;
        self.replace(entry.clone());
        Ok(entry)
    }

    fn add_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        delay: f32,
    ) -> Result<TrackEntry, PlaybackError> {
        let entry = self.new_entry(track, clip, looped, delay, 0.0)?;
        self.enqueue(entry.clone());
        Ok(entry)
    }

    fn set_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: f32,
    ) -> Result<TrackEntry, PlaybackError> {
        let entry = self.new_entry(track, EMPTY_CLIP, false, 0.0, mix_duration)?;
        self.replace(entry.clone());
        Ok(entry)
    }

    fn add_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: f32,
        delay: f32,
    ) -> Result<TrackEntry, PlaybackError> {
        let entry = self.new_entry(track, EMPTY_CLIP, false, delay, mix_duration)?;
        self.enqueue(entry.clone());
        Ok(entry)
    }

    fn current(&self, track: TrackIndex) -> Option<TrackEntry> {
        self.tracks.get(&track).and_then(|t| t.current.clone())
    }

    fn tracks(&self) -> Vec<TrackEntry> {
        self.tracks
            .values()
            .filter_map(|t| t.current.clone())
            .collect()
    }

    fn set_mix_duration(&mut self, entry: TrackEntryId, mix_duration: f32) {
        if let Some(entry) = self.entry_mut(entry) {
            entry.mix_duration = mix_duration;
        }
    }

    fn set_time_scale(&mut self, entry: TrackEntryId, time_scale: f32) {
        if let Some(entry) = self.entry_mut(entry) {
            entry.time_scale = time_scale;
        }
    }

    fn set_alpha(&mut self, entry: TrackEntryId, alpha: f32) {
        if let Some(entry) = self.entry_mut(entry) {
            entry.alpha = alpha;
        }
    }

    fn clear_track(&mut self, track: TrackIndex) {
        if let Some(current) = self.tracks.remove(&track).and_then(|t| t.current) {
            self.finish(current, false);
        }
    }

    fn advance(&mut self, delta_time: f32) {
        let indices: Vec<TrackIndex> = self.tracks.keys().copied().collect();
        for index in indices {
            self.advance_track(index, delta_time);
        }
    }

    fn drain_notifications(&mut self) -> Vec<PlaybackNotification> {
        std::mem::take(&mut self.notifications)
    }
}
