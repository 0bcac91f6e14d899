//! 运行时状态机
//!
//! [`SpineFsm`] 把播放器的轨道通知和外部设置的布尔条件翻译成状态的
//! 进入/更新/退出调用。状态分三类：
//!
//! - 全局状态：注册后一直处于激活状态
//! - 条件状态：对应条件为 true 时激活
//! - 片段状态：对应片段是某条轨道的当前片段时激活
//!
//! 每帧的 [`SpineFsm::update`] 固定按 全局 -> 条件 -> 片段 的顺序更新，
//! 前面阶段写入的数据在同一帧内对后面的阶段可见。

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::mem;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::config::FsmConfig;
use super::error::{FsmError, Result};
use super::event::EventSubscribers;
use super::logging::{self, LogCategories};
use super::player::{AnimationPlayer, PlayOptions, PlaybackNotification, TrackEntry};
use super::properties::Properties;
use super::state::{StateBehavior, StateHandle};
use super::types::{FsmId, GLOBAL_KEY, SubscriptionId, TrackIndex};
use crate::utils::tool::validate_key;

static NEXT_FSM_ID: AtomicU64 = AtomicU64::new(1);

/// 运行时状态机
pub struct SpineFsm {
    id: FsmId,
    name: String,
    player: Box<dyn AnimationPlayer>,
    global_states: Vec<StateHandle>,
    conditional_states: BTreeMap<String, Vec<StateHandle>>,
    /// 片段名 -> 片段状态
    states: HashMap<String, Vec<StateHandle>>,
    alphas: HashMap<String, f32>,
    time_scales: HashMap<String, f32>,
    events: EventSubscribers,
    properties: Properties,
    /// 构造时从播放器读取，之后不再变化
    valid_clips: HashSet<String>,
    logging: LogCategories,
    empty_mix_duration: f32,
    /// 尚未派发的播放通知
    pending: VecDeque<PlaybackNotification>,
    draining: bool,
    hook_depth: usize,
    detached: bool,
}

impl SpineFsm {
    /// 使用默认配置创建状态机
    pub fn new(name: impl Into<String>, player: impl AnimationPlayer + 'static) -> Self {
        Self::with_config(name, player, FsmConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        player: impl AnimationPlayer + 'static,
        config: FsmConfig,
    ) -> Self {
        let valid_clips = player.clip_names().into_iter().collect();
        let fsm = Self {
            id: NEXT_FSM_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            player: Box::new(player),
            global_states: Vec::new(),
            conditional_states: BTreeMap::new(),
            states: HashMap::new(),
            alphas: HashMap::new(),
            time_scales: HashMap::new(),
            events: EventSubscribers::new(),
            properties: Properties::new(),
            valid_clips,
            logging: config.logging,
            empty_mix_duration: config.empty_mix_duration.max(0.0),
            pending: VecDeque::new(),
            draining: false,
            hook_depth: 0,
            detached: false,
        };
        fsm.log(
            format_args!("Created ({} valid clips)", fsm.valid_clips.len()),
            LogCategories::STATE_SETUP,
        );
        fsm
    }

    pub fn id(&self) -> FsmId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn player(&self) -> &dyn AnimationPlayer {
        self.player.as_ref()
    }

    /// 宿主通过这里推进播放器；产生的通知在下一次 `update` 或
    /// `poll_player` 时派发
    pub fn player_mut(&mut self) -> &mut dyn AnimationPlayer {
        self.player.as_mut()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// `clear_all` 之后为 true，此时状态机不再可用
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    // ---- 状态注册 ----

    pub fn add_global_state<B: StateBehavior + 'static>(
        &mut self,
        state: &StateHandle<B>,
    ) -> Result<()> {
        self.ensure_attached()?;
        let state = state.erase();
        state.retain(self, GLOBAL_KEY)?;
        self.global_states.push(state.clone());
        self.log(
            format_args!("Global State Added ({})", state.type_name()),
            LogCategories::STATE_SETUP,
        );
        state.enter(self)
    }

    pub fn remove_global_state<B: StateBehavior + ?Sized>(
        &mut self,
        state: &StateHandle<B>,
    ) -> Result<()> {
        self.ensure_attached()?;
        if !self.global_states.iter().any(|s| s.ptr_eq(state)) {
            return Err(self.not_found(state, GLOBAL_KEY));
        }
        state.ensure_idle()?;
        self.global_states.retain(|s| !s.ptr_eq(state));
        self.log(
            format_args!("Global State Removed ({})", state.type_name()),
            LogCategories::STATE_SETUP,
        );
        state.release(self)
    }

    /// 注册条件状态；条件当前为 true 时立即进入
    pub fn add_conditional_state<B: StateBehavior + 'static>(
        &mut self,
        condition: &str,
        state: &StateHandle<B>,
    ) -> Result<()> {
        self.ensure_attached()?;
        validate_key("condition", condition)?;
        let state = state.erase();
        state.retain(self, condition)?;
        self.conditional_states
            .entry(condition.to_string())
            .or_default()
            .push(state.clone());
        self.log(
            format_args!(
                "Conditional State Added For {} ({})",
                condition,
                state.type_name()
            ),
            LogCategories::STATE_SETUP,
        );
        if self.properties.get_bool(condition) {
            state.enter(self)?;
        }
        Ok(())
    }

    pub fn remove_conditional_state<B: StateBehavior + ?Sized>(
        &mut self,
        state: &StateHandle<B>,
    ) -> Result<()> {
        self.ensure_attached()?;
        state.ensure_idle()?;
        let key = state.key().unwrap_or_default();
        let registered = self
            .conditional_states
            .get(&key)
            .is_some_and(|list| list.iter().any(|s| s.ptr_eq(state)));
        if !registered {
            return Err(self.not_found(state, &key));
        }
        if let Some(list) = self.conditional_states.get_mut(&key) {
            list.retain(|s| !s.ptr_eq(state));
        }
        self.log(
            format_args!(
                "Conditional State Removed For {} ({})",
                key,
                state.type_name()
            ),
            LogCategories::STATE_SETUP,
        );
        state.release(self)
    }

    /// 注册片段状态；片段正在某条轨道上播放时立即以该轨道条目进入
    pub fn add_state<B: StateBehavior + 'static>(
        &mut self,
        clip: &str,
        state: &StateHandle<B>,
    ) -> Result<()> {
        self.ensure_attached()?;
        validate_key("clip", clip)?;
        let state = state.erase();
        state.retain(self, clip)?;
        self.states
            .entry(clip.to_string())
            .or_default()
            .push(state.clone());
        self.log(
            format_args!("State Added For Clip {} ({})", clip, state.type_name()),
            LogCategories::STATE_SETUP,
        );
        if let Some(entry) = self.find_playing_clip(clip) {
            state.enter_track(self, &entry)?;
        }
        Ok(())
    }

    /// 移除片段状态，片段的状态列表为空时一并删除
    pub fn remove_state<B: StateBehavior + ?Sized>(&mut self, state: &StateHandle<B>) -> Result<()> {
        self.ensure_attached()?;
        state.ensure_idle()?;
        let key = state.key().unwrap_or_default();
        let registered = self
            .states
            .get(&key)
            .is_some_and(|list| list.iter().any(|s| s.ptr_eq(state)));
        if !registered {
            return Err(self.not_found(state, &key));
        }
        if let Some(list) = self.states.get_mut(&key) {
            list.retain(|s| !s.ptr_eq(state));
            if list.is_empty() {
                self.states.remove(&key);
            }
        }
        self.log(
            format_args!("State Removed For Clip {} ({})", key, state.type_name()),
            LogCategories::STATE_SETUP,
        );
        state.release(self)
    }

    pub fn global_states(&self) -> &[StateHandle] {
        &self.global_states
    }

    pub fn conditional_states(&self, condition: &str) -> Result<&[StateHandle]> {
        self.conditional_states
            .get(condition)
            .map(Vec::as_slice)
            .ok_or_else(|| self.key_not_found(condition))
    }

    pub fn clip_states(&self, clip: &str) -> Result<&[StateHandle]> {
        self.states
            .get(clip)
            .map(Vec::as_slice)
            .ok_or_else(|| self.key_not_found(clip))
    }

    // ---- 动画控制 ----

    pub fn set_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        options: PlayOptions,
    ) -> Result<TrackEntry> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        let entry = self.player.set_animation(track, clip, looped)?;
        let entry = self.apply_play_options(entry, &options);
        self.log(
            format_args!("Set Animation (Track: {track}, Clip: {clip}, Looping: {looped})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.poll_player()?;
        Ok(entry)
    }

    /// 只有轨道当前片段不同（或轨道为空）时才播放，否则返回 `None`
    pub fn set_animation_if_different(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        options: PlayOptions,
    ) -> Result<Option<TrackEntry>> {
        self.ensure_attached()?;
        validate_key("clip", clip)?;
        if self.is_playing_clip(track, clip) {
            return Ok(None);
        }
        self.set_animation(track, clip, looped, options).map(Some)
    }

    pub fn queue_animation(
        &mut self,
        track: TrackIndex,
        clip: &str,
        looped: bool,
        delay: f32,
        options: PlayOptions,
    ) -> Result<TrackEntry> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        let entry = self
            .player
            .add_animation(track, clip, looped, delay.max(0.0))?;
        let entry = self.apply_play_options(entry, &options);
        self.log(
            format_args!("Queue Animation (Track: {track}, Clip: {clip}, Looping: {looped})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.poll_player()?;
        Ok(entry)
    }

    /// `mix_duration` 为 `None` 时使用配置中的默认值
    pub fn set_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: Option<f32>,
    ) -> Result<TrackEntry> {
        self.ensure_attached()?;
        let mix_duration = mix_duration.unwrap_or(self.empty_mix_duration).max(0.0);
        self.log(
            format_args!("Set Empty Animation (Track: {track})"),
            LogCategories::ANIMATION_SETUP,
        );
        let entry = self.player.set_empty_animation(track, mix_duration)?;
        self.poll_player()?;
        Ok(entry)
    }

    pub fn queue_empty_animation(
        &mut self,
        track: TrackIndex,
        mix_duration: f32,
        delay: f32,
    ) -> Result<TrackEntry> {
        self.ensure_attached()?;
        self.log(
            format_args!("Queue Empty Animation (Track: {track})"),
            LogCategories::ANIMATION_SETUP,
        );
        let entry = self
            .player
            .add_empty_animation(track, mix_duration.max(0.0), delay.max(0.0))?;
        self.poll_player()?;
        Ok(entry)
    }

    fn apply_play_options(&mut self, mut entry: TrackEntry, options: &PlayOptions) -> TrackEntry {
        if let Some(mix_duration) = options.mix_duration {
            let mix_duration = mix_duration.max(0.0);
            self.player.set_mix_duration(entry.id, mix_duration);
            entry.mix_duration = mix_duration;
        }

        if let Some(time_scale) = options.time_scale {
            self.time_scales.insert(entry.clip.clone(), time_scale);
        }
        if let Some(&time_scale) = self.time_scales.get(&entry.clip) {
            self.player.set_time_scale(entry.id, time_scale);
            entry.time_scale = time_scale;
        }

        if let Some(alpha) = options.alpha {
            self.alphas.insert(entry.clip.clone(), alpha);
        }
        if let Some(&alpha) = self.alphas.get(&entry.clip) {
            self.player.set_alpha(entry.id, alpha);
            entry.alpha = alpha;
        }
        entry
    }

    // 单个片段的设置，只影响之后创建的轨道条目

    pub fn set_alpha(&mut self, clip: &str, alpha: f32) -> Result<()> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        self.log(
            format_args!("Set Alpha (Clip: {clip}, Alpha: {alpha})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.alphas.insert(clip.to_string(), alpha);
        Ok(())
    }

    pub fn unset_alpha(&mut self, clip: &str) -> Result<()> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        self.log(
            format_args!("Unset Alpha (Clip: {clip})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.alphas.remove(clip);
        Ok(())
    }

    pub fn alpha(&self, clip: &str) -> Option<f32> {
        self.alphas.get(clip).copied()
    }

    pub fn set_time_scale(&mut self, clip: &str, time_scale: f32) -> Result<()> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        self.log(
            format_args!("Set Timescale (Clip: {clip}, Timescale: {time_scale})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.time_scales.insert(clip.to_string(), time_scale);
        Ok(())
    }

    pub fn unset_time_scale(&mut self, clip: &str) -> Result<()> {
        self.ensure_attached()?;
        self.ensure_valid_clip(clip)?;
        self.log(
            format_args!("Unset Timescale (Clip: {clip})"),
            LogCategories::ANIMATION_SETUP,
        );
        self.time_scales.remove(clip);
        Ok(())
    }

    pub fn time_scale(&self, clip: &str) -> Option<f32> {
        self.time_scales.get(clip).copied()
    }

    // ---- 条件与属性 ----

    /// 设置条件。值不变时什么都不做，否则进入或退出该条件下的所有状态
    pub fn set_condition(&mut self, condition: &str, active: bool) -> Result<()> {
        self.ensure_attached()?;
        validate_key("condition", condition)?;
        self.log(
            format_args!("Set Condition (Key: {condition}, State: {active})"),
            LogCategories::PROPERTIES,
        );

        if self.properties.get_bool(condition) == active {
            return Ok(());
        }
        self.properties.set_bool(condition, active);
        for state in self.conditional_snapshot(condition) {
            if !state.is_retained_by(self) {
                continue;
            }
            if active {
                state.enter(self)?;
            } else {
                state.exit(self)?;
            }
        }
        Ok(())
    }

    /// 关闭 `previous`，打开 `next`
    ///
    /// `previous` 为 true 时先退出它的状态；`next` 原本不为 true 时再进入它的状态。
    pub fn swap_condition(&mut self, previous: &str, next: &str) -> Result<()> {
        self.ensure_attached()?;
        validate_key("condition", previous)?;
        validate_key("condition", next)?;
        self.log(
            format_args!("Swap Condition (Previous: {previous}, Next: {next})"),
            LogCategories::PROPERTIES,
        );

        if self.properties.get_bool(previous) {
            for state in self.conditional_snapshot(previous) {
                if state.is_retained_by(self) {
                    state.exit(self)?;
                }
            }
        }
        self.properties.set_bool(previous, false);

        if !self.properties.get_bool(next) {
            for state in self.conditional_snapshot(next) {
                if state.is_retained_by(self) {
                    state.enter(self)?;
                }
            }
        }
        self.properties.set_bool(next, true);
        Ok(())
    }

    pub fn get_condition(&self, condition: &str) -> bool {
        self.properties.get_bool(condition)
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> Result<()> {
        self.ensure_attached()?;
        self.log(
            format_args!("Set Float Property (Key: {name}, Value: {value})"),
            LogCategories::PROPERTIES,
        );
        self.properties.set_float(name, value);
        Ok(())
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        self.properties.get_float(name)
    }

    pub fn is_float_defined(&self, name: &str) -> bool {
        self.properties.contains_float(name)
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> Result<()> {
        self.ensure_attached()?;
        self.log(
            format_args!("Set Int Property (Key: {name}, Value: {value})"),
            LogCategories::PROPERTIES,
        );
        self.properties.set_int(name, value);
        Ok(())
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        self.properties.get_int(name)
    }

    pub fn is_int_defined(&self, name: &str) -> bool {
        self.properties.contains_int(name)
    }

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.ensure_attached()?;
        let value = value.into();
        self.log(
            format_args!("Set String Property (Key: {name}, Value: {value})"),
            LogCategories::PROPERTIES,
        );
        self.properties.set_string(name, value);
        Ok(())
    }

    pub fn get_string(&self, name: &str) -> Result<&str> {
        self.properties.get_string(name)
    }

    pub fn is_string_defined(&self, name: &str) -> bool {
        self.properties.contains_string(name)
    }

    // ---- 播放 ----

    /// 直接派发一条播放通知
    pub fn handle_notification(&mut self, notification: PlaybackNotification) -> Result<()> {
        if self.detached {
            return Ok(());
        }
        let entry = notification.entry();
        self.log(
            format_args!(
                "Notification Received (Clip: {}, Track: {})",
                entry.clip, entry.track_index
            ),
            LogCategories::ANIMATION_PLAYBACK,
        );
        self.pending.push_back(notification);
        self.poll_player()
    }

    /// 取走播放器中的通知并按顺序派发
    ///
    /// 钩子执行期间或已在派发时只入队，由外层调用负责派发。
    pub fn poll_player(&mut self) -> Result<()> {
        if self.detached {
            return Ok(());
        }
        self.pending.extend(self.player.drain_notifications());
        if self.draining || self.hook_depth > 0 {
            return Ok(());
        }

        self.draining = true;
        let result = self.drain_pending();
        self.draining = false;
        result
    }

    fn drain_pending(&mut self) -> Result<()> {
        while let Some(notification) = self.pending.pop_front() {
            self.dispatch(notification)?;
            self.pending.extend(self.player.drain_notifications());
        }
        Ok(())
    }

    fn dispatch(&mut self, notification: PlaybackNotification) -> Result<()> {
        match notification {
            PlaybackNotification::Start(entry) => self.on_track_start(&entry),
            PlaybackNotification::Interrupt(entry) => self.on_track_interrupt(&entry),
            PlaybackNotification::End(entry) => self.on_track_end(&entry),
            PlaybackNotification::Event { entry, name } => {
                self.on_event(&entry, &name);
                Ok(())
            }
        }
    }

    fn on_track_start(&mut self, entry: &TrackEntry) -> Result<()> {
        self.log(
            format_args!(
                "Track Start (Clip: {}, Track: {})",
                entry.clip, entry.track_index
            ),
            LogCategories::ANIMATION_PLAYBACK,
        );
        // 通知中的快照早于覆盖值写入，优先使用播放器中的当前条目
        let live = self
            .player
            .current(entry.track_index)
            .filter(|current| current.id == entry.id)
            .unwrap_or_else(|| entry.clone());
        for state in self.clip_snapshot(&live.clip) {
            if state.is_retained_by(self) {
                state.enter_track(self, &live)?;
            }
        }
        Ok(())
    }

    fn on_track_interrupt(&mut self, entry: &TrackEntry) -> Result<()> {
        self.log(
            format_args!(
                "Track Interrupt (Clip: {}, Track: {})",
                entry.clip, entry.track_index
            ),
            LogCategories::ANIMATION_PLAYBACK,
        );
        self.exit_clip_states(entry)
    }

    fn on_track_end(&mut self, entry: &TrackEntry) -> Result<()> {
        self.log(
            format_args!(
                "Track End (Clip: {}, Track: {})",
                entry.clip, entry.track_index
            ),
            LogCategories::ANIMATION_PLAYBACK,
        );
        self.exit_clip_states(entry)
    }

    fn exit_clip_states(&mut self, entry: &TrackEntry) -> Result<()> {
        for state in self.clip_snapshot(&entry.clip) {
            if state.is_retained_by(self) {
                state.exit_track(self, entry)?;
            }
        }
        Ok(())
    }

    /// 每帧调用一次
    pub fn update(&mut self, delta_time: f32) -> Result<()> {
        self.ensure_attached()?;
        self.poll_player()?;

        for state in self.global_states.clone() {
            if state.is_retained_by(self) {
                state.update(self, delta_time)?;
            }
        }

        let conditions: Vec<String> = self.conditional_states.keys().cloned().collect();
        for condition in conditions {
            if !self.properties.get_bool(&condition) {
                continue;
            }
            for state in self.conditional_snapshot(&condition) {
                if state.is_retained_by(self) {
                    state.update(self, delta_time)?;
                }
            }
        }

        for entry in self.player.tracks() {
            for state in self.clip_snapshot(&entry.clip) {
                if state.is_retained_by(self) {
                    state.update_track(self, &entry, delta_time)?;
                }
            }
        }

        self.exit_stale_clip_states()
    }

    /// 片段已不在任何轨道上时退出仍处于激活的片段状态
    /// （轨道结束但播放器没有发出 interrupt/end 的情况）
    fn exit_stale_clip_states(&mut self) -> Result<()> {
        self.poll_player()?;
        let live = self.player.tracks();
        let mut stale: Vec<(String, StateHandle)> = self
            .states
            .iter()
            .filter(|(clip, _)| !live.iter().any(|entry| entry.clip == **clip))
            .flat_map(|(clip, list)| list.iter().map(move |s| (clip.clone(), s.clone())))
            .filter(|(_, state)| state.is_active_unchecked())
            .collect();
        stale.sort_by(|a, b| a.0.cmp(&b.0));

        for (clip, state) in stale {
            if !state.is_retained_by(self) {
                continue;
            }
            self.log(
                format_args!("Implicit Exit (Clip: {clip}, State: {})", state.type_name()),
                LogCategories::ANIMATION_PLAYBACK,
            );
            state.exit(self)?;
        }
        Ok(())
    }

    // ---- 事件 ----

    pub fn subscribe_to_event(
        &mut self,
        event: &str,
        callback: impl Fn() + 'static,
    ) -> Result<SubscriptionId> {
        self.ensure_attached()?;
        validate_key("event", event)?;
        self.log(
            format_args!("Event Subscribed (Event: {event})"),
            LogCategories::EVENT_SETUP,
        );
        Ok(self.events.subscribe(event, Rc::new(callback)))
    }

    /// 返回是否找到该订阅
    pub fn unsubscribe_from_event(&mut self, event: &str, id: SubscriptionId) -> Result<bool> {
        validate_key("event", event)?;
        self.log(
            format_args!("Event Unsubscribed (Event: {event})"),
            LogCategories::EVENT_SETUP,
        );
        Ok(self.events.unsubscribe(event, id))
    }

    pub fn event_subscriber_count(&self, event: &str) -> usize {
        self.events.subscriber_count(event)
    }

    fn on_event(&mut self, entry: &TrackEntry, name: &str) {
        self.log(
            format_args!("Event Fired (Event: {name}, Clip: {})", entry.clip),
            LogCategories::EVENT_PLAYBACK,
        );
        for callback in self.events.snapshot(name) {
            callback();
        }
    }

    // ---- 清理 ----

    pub fn clear_global_states(&mut self) -> Result<()> {
        self.log("Cleared Global States", LogCategories::STATE_SETUP);
        let states = mem::take(&mut self.global_states);
        self.release_all(states)
    }

    pub fn clear_conditional_states(&mut self) -> Result<()> {
        self.log("Cleared Conditional States", LogCategories::STATE_SETUP);
        let states = mem::take(&mut self.conditional_states)
            .into_values()
            .flatten()
            .collect();
        self.release_all(states)
    }

    pub fn clear_states(&mut self) -> Result<()> {
        self.log("Cleared Clip States", LogCategories::STATE_SETUP);
        let states = mem::take(&mut self.states)
            .into_values()
            .flatten()
            .collect();
        self.release_all(states)
    }

    pub fn clear_all_states(&mut self) -> Result<()> {
        let global = self.clear_global_states();
        let conditional = self.clear_conditional_states();
        let clips = self.clear_states();
        self.log("Cleared All States", LogCategories::STATE_SETUP);
        global.and(conditional).and(clips)
    }

    /// 清空所有条件，并退出原本为 true 的条件下的状态
    pub fn clear_conditions(&mut self) -> Result<()> {
        self.log("Cleared Conditions", LogCategories::PROPERTIES);
        let mut active: Vec<String> = self.properties.true_bools().map(str::to_string).collect();
        active.sort();
        self.properties.clear_bools();

        let mut result = Ok(());
        for condition in active {
            for state in self.conditional_snapshot(&condition) {
                if state.is_retained_by(self) {
                    keep_first_error(&mut result, state.exit(self));
                }
            }
        }
        result
    }

    /// 清空条件以外的所有属性
    pub fn clear_properties(&mut self) {
        self.log("Cleared All Properties", LogCategories::PROPERTIES);
        self.properties.clear_ints();
        self.properties.clear_floats();
        self.properties.clear_strings();
    }

    pub fn clear_alphas(&mut self) {
        self.log("Cleared Alphas", LogCategories::ANIMATION_SETUP);
        self.alphas.clear();
    }

    pub fn clear_time_scales(&mut self) {
        self.log("Cleared Timescales", LogCategories::ANIMATION_SETUP);
        self.time_scales.clear();
    }

    pub fn clear_events(&mut self) {
        self.log("Cleared Event Subscriptions", LogCategories::EVENT_SETUP);
        self.events.clear();
    }

    /// 完全重置：释放所有状态、清空所有数据并停止接收播放通知。
    /// 之后状态机不可再使用
    pub fn clear_all(&mut self) -> Result<()> {
        self.log("Cleared All Data (Full Reset)", LogCategories::PROPERTIES);
        let result = self.clear_all_states();
        self.properties.clear();
        self.alphas.clear();
        self.time_scales.clear();
        self.events.clear();
        self.pending.clear();
        self.detached = true;
        result
    }

    fn release_all(&mut self, states: Vec<StateHandle>) -> Result<()> {
        let mut result = Ok(());
        for state in states {
            keep_first_error(&mut result, state.release(self));
        }
        result
    }

    // ---- 查询 ----

    pub fn get_current(&self, track: TrackIndex) -> Option<TrackEntry> {
        self.player.current(track)
    }

    pub fn is_track_empty(&self, track: TrackIndex) -> bool {
        self.get_current(track).is_none()
    }

    pub fn is_playing_clip(&self, track: TrackIndex, clip: &str) -> bool {
        self.get_current(track).is_some_and(|entry| entry.clip == clip)
    }

    pub fn is_valid_clip(&self, clip: &str) -> bool {
        self.valid_clips.contains(clip)
    }

    pub fn valid_clips(&self) -> impl Iterator<Item = &str> {
        self.valid_clips.iter().map(String::as_str)
    }

    pub fn is_clip_playing(&self, clip: &str) -> bool {
        self.find_playing_clip(clip).is_some()
    }

    /// 返回第一条正在播放该片段的轨道条目
    pub fn find_playing_clip(&self, clip: &str) -> Option<TrackEntry> {
        self.player.tracks().into_iter().find(|entry| entry.clip == clip)
    }

    // ---- 日志 ----

    pub fn logging(&self) -> LogCategories {
        self.logging
    }

    pub fn set_logging(&mut self, logging: LogCategories) {
        self.logging = logging;
        self.log(
            format_args!("Set Logging ({logging})"),
            LogCategories::PROPERTIES,
        );
    }

    /// 类别在掩码中时输出日志
    pub fn log(&self, message: impl fmt::Display, category: LogCategories) {
        if self.logging.contains(category) {
            logging::emit(&self.name, category, &message);
        }
    }

    // ---- 内部 ----

    pub(crate) fn enter_hook(&mut self) {
        self.hook_depth += 1;
    }

    pub(crate) fn leave_hook(&mut self) {
        self.hook_depth = self.hook_depth.saturating_sub(1);
    }

    pub(crate) fn ensure_attached(&self) -> Result<()> {
        if self.detached {
            return Err(FsmError::Detached {
                fsm: self.name.clone(),
            });
        }
        Ok(())
    }

    fn ensure_valid_clip(&self, clip: &str) -> Result<()> {
        validate_key("clip", clip)?;
        if !self.is_valid_clip(clip) {
            return Err(FsmError::InvalidClip {
                clip: clip.to_string(),
            });
        }
        Ok(())
    }

    fn conditional_snapshot(&self, condition: &str) -> Vec<StateHandle> {
        self.conditional_states
            .get(condition)
            .cloned()
            .unwrap_or_default()
    }

    fn clip_snapshot(&self, clip: &str) -> Vec<StateHandle> {
        self.states.get(clip).cloned().unwrap_or_default()
    }

    fn not_found<B: ?Sized>(&self, state: &StateHandle<B>, key: &str) -> FsmError {
        FsmError::StateNotFound {
            state: state.type_name().to_string(),
            key: key.to_string(),
            fsm: self.name.clone(),
        }
    }

    fn key_not_found(&self, key: &str) -> FsmError {
        FsmError::KeyNotFound {
            key: key.to_string(),
            fsm: self.name.clone(),
        }
    }
}

fn keep_first_error(result: &mut Result<()>, next: Result<()>) {
    if result.is_ok() {
        *result = next;
    }
}

impl fmt::Debug for SpineFsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpineFsm")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("global_states", &self.global_states.len())
            .field("conditional_states", &self.conditional_states.len())
            .field("clip_states", &self.states.len())
            .field("logging", &self.logging)
            .field("detached", &self.detached)
            .finish()
    }
}
