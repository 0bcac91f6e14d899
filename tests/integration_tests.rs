use std::cell::RefCell;
use std::rc::Rc;

use spine_fsm::core::PlaybackNotification;
use spine_fsm::{
    AnimationPlayer, ContextBehavior, ContextFsm, ContextState, FsmConfig, FsmError,
    LogCategories, PlayOptions, ScriptedPlayer, Shared, SpineFsm, StateBehavior, StateHandle,
    StateScope,
};

type Journal = Rc<RefCell<Vec<String>>>;

/// 把每次钩子调用记到日志里
struct Recorder {
    name: &'static str,
    journal: Journal,
}

impl Recorder {
    fn push(&self, hook: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{}:{}", self.name, hook));
    }
}

impl StateBehavior for Recorder {
    fn on_enter(&mut self, _scope: &mut StateScope<'_>) -> spine_fsm::Result<()> {
        self.push("enter");
        Ok(())
    }

    fn on_update(&mut self, _scope: &mut StateScope<'_>, _delta_time: f32) -> spine_fsm::Result<()> {
        self.push("update");
        Ok(())
    }

    fn on_exit(&mut self, _scope: &mut StateScope<'_>) -> spine_fsm::Result<()> {
        self.push("exit");
        Ok(())
    }
}

/// 更新时把轨道切到另一个片段（只切一次）
struct SwitchClip {
    to: &'static str,
    switched: bool,
    journal: Journal,
}

impl StateBehavior for SwitchClip {
    fn on_enter(&mut self, _scope: &mut StateScope<'_>) -> spine_fsm::Result<()> {
        self.journal.borrow_mut().push("switch:enter".to_string());
        Ok(())
    }

    fn on_update(&mut self, scope: &mut StateScope<'_>, _delta_time: f32) -> spine_fsm::Result<()> {
        self.journal.borrow_mut().push("switch:update".to_string());
        if !self.switched {
            self.switched = true;
            let track = scope.track()?.track_index;
            scope
                .fsm()
                .set_animation(track, self.to, true, PlayOptions::new())?;
        }
        Ok(())
    }

    fn on_exit(&mut self, _scope: &mut StateScope<'_>) -> spine_fsm::Result<()> {
        self.journal.borrow_mut().push("switch:exit".to_string());
        Ok(())
    }
}

/// 更新时移除 `target` 指向的全局状态
struct Remover {
    target: Rc<RefCell<Option<StateHandle>>>,
    journal: Journal,
}

impl StateBehavior for Remover {
    fn on_update(&mut self, scope: &mut StateScope<'_>, _delta_time: f32) -> spine_fsm::Result<()> {
        self.journal.borrow_mut().push("remover:update".to_string());
        let target = self.target.borrow_mut().take();
        if let Some(target) = target {
            scope.fsm().remove_global_state(&target)?;
        }
        Ok(())
    }
}

/// 进入时记下当前轨道条目的时间缩放和透明度
struct TrackSnapshot {
    seen: Rc<RefCell<Vec<(f32, f32)>>>,
}

impl StateBehavior for TrackSnapshot {
    fn on_enter(&mut self, scope: &mut StateScope<'_>) -> spine_fsm::Result<()> {
        let track = scope.track()?;
        self.seen.borrow_mut().push((track.time_scale, track.alpha));
        Ok(())
    }
}

// --- 测试用例 ---
#[cfg(test)]
mod tests {
    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn player() -> ScriptedPlayer {
        ScriptedPlayer::new()
            .with_clip("idle", 1.0)
            .with_clip("walk", 0.5)
            .with_event("walk", 0.25, "footstep")
    }

    fn create_fsm() -> SpineFsm {
        init_tracing();
        SpineFsm::with_config(
            "test",
            player(),
            FsmConfig::default().with_logging(LogCategories::ALL),
        )
    }

    fn journal() -> Journal {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn recorder(name: &'static str, journal: &Journal) -> StateHandle<Recorder> {
        StateHandle::new(Recorder {
            name,
            journal: Rc::clone(journal),
        })
    }

    fn take(journal: &Journal) -> Vec<String> {
        journal.borrow_mut().drain(..).collect()
    }

    #[test]
    fn test_fresh_state_is_unretained() {
        let j = journal();
        let state = recorder("a", &j);
        assert!(!state.is_retained());
        assert!(!state.is_active());
        assert_eq!(state.key(), None);
        assert_eq!(state.type_name(), "Recorder");
    }

    #[test]
    fn test_retain_twice_fails() {
        let j = journal();
        let state = recorder("a", &j);
        let mut first = create_fsm();
        let mut second = create_fsm();

        first.add_global_state(&state).unwrap();
        let err = second.add_global_state(&state).unwrap_err();
        assert!(matches!(err, FsmError::AlreadyRetained { ref owner, .. } if owner == "test"));
        assert_eq!(state.owner_name().as_deref(), Some("test"));
        assert!(second.global_states().is_empty());
    }

    #[test]
    fn test_release_active_state_exits_once() {
        let j = journal();
        let state = recorder("a", &j);
        let mut fsm = create_fsm();

        fsm.add_global_state(&state).unwrap();
        assert!(state.is_active());
        fsm.remove_global_state(&state).unwrap();

        assert_eq!(take(&j), vec!["a:enter", "a:exit"]);
        assert!(!state.is_retained());
        assert!(!state.is_active());

        // 释放后可以被另一个状态机持有
        let mut other = create_fsm();
        other.add_global_state(&state).unwrap();
        assert!(state.is_active());
    }

    #[test]
    fn test_redundant_enter_and_exit_are_ignored() {
        let j = journal();
        let state = recorder("a", &j);
        let mut fsm = create_fsm();

        fsm.add_global_state(&state).unwrap();
        state.enter(&mut fsm).unwrap();
        assert_eq!(take(&j), vec!["a:enter"]);

        state.exit(&mut fsm).unwrap();
        state.exit(&mut fsm).unwrap();
        state.update(&mut fsm, 0.016).unwrap();
        assert_eq!(take(&j), vec!["a:exit"]);
    }

    #[test]
    fn test_lifecycle_requires_owner() {
        let j = journal();
        let state = recorder("a", &j);
        let mut fsm = create_fsm();
        let mut other = create_fsm();

        assert!(matches!(
            state.enter(&mut fsm),
            Err(FsmError::NotRetained { .. })
        ));

        fsm.add_conditional_state("ready", &state).unwrap();
        assert!(matches!(
            state.enter(&mut other),
            Err(FsmError::WrongOwner { .. })
        ));
        assert!(take(&j).is_empty());
    }

    #[test]
    fn test_set_condition_toggles_in_registration_order() {
        let j = journal();
        let a = recorder("a", &j);
        let b = recorder("b", &j);
        let mut fsm = create_fsm();

        fsm.add_conditional_state("ready", &a).unwrap();
        fsm.add_conditional_state("ready", &b).unwrap();
        assert!(take(&j).is_empty());

        fsm.set_condition("ready", true).unwrap();
        assert_eq!(take(&j), vec!["a:enter", "b:enter"]);

        // 已经为 true，不再调用钩子
        fsm.set_condition("ready", true).unwrap();
        assert!(take(&j).is_empty());

        fsm.set_condition("ready", false).unwrap();
        fsm.set_condition("ready", true).unwrap();
        assert_eq!(take(&j), vec!["a:exit", "b:exit", "a:enter", "b:enter"]);
    }

    #[test]
    fn test_conditional_state_added_under_true_condition_enters() {
        let j = journal();
        let a = recorder("a", &j);
        let mut fsm = create_fsm();

        fsm.set_condition("ready", true).unwrap();
        fsm.add_conditional_state("ready", &a).unwrap();
        assert_eq!(take(&j), vec!["a:enter"]);
        assert_eq!(a.key().as_deref(), Some("ready"));

        fsm.remove_conditional_state(&a).unwrap();
        assert_eq!(take(&j), vec!["a:exit"]);
        assert!(fsm.conditional_states("ready").unwrap().is_empty());
    }

    #[test]
    fn test_swap_condition() {
        let j = journal();
        let idle = recorder("idle", &j);
        let moving = recorder("moving", &j);
        let mut fsm = create_fsm();

        fsm.add_conditional_state("idle", &idle).unwrap();
        fsm.add_conditional_state("moving", &moving).unwrap();
        fsm.set_condition("idle", true).unwrap();
        take(&j);

        fsm.swap_condition("idle", "moving").unwrap();
        assert_eq!(take(&j), vec!["idle:exit", "moving:enter"]);
        assert!(!fsm.get_condition("idle"));
        assert!(fsm.get_condition("moving"));

        // 目标条件已经为 true 时不会重复进入
        fsm.swap_condition("idle", "moving").unwrap();
        assert!(take(&j).is_empty());
    }

    #[test]
    fn test_clip_state_registered_while_playing() {
        let j = journal();
        let walk = recorder("walk", &j);
        let mut fsm = create_fsm();

        let entry = fsm.set_animation(1, "walk", true, PlayOptions::new()).unwrap();
        fsm.add_state("walk", &walk).unwrap();

        assert_eq!(take(&j), vec!["walk:enter"]);
        assert_eq!(walk.track().map(|t| t.id), Some(entry.id));

        fsm.remove_state(&walk).unwrap();
        assert_eq!(take(&j), vec!["walk:exit"]);
        assert!(matches!(
            fsm.clip_states("walk"),
            Err(FsmError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_set_animation_if_different() {
        let mut fsm = create_fsm();

        let first = fsm
            .set_animation_if_different(0, "walk", true, PlayOptions::new())
            .unwrap();
        assert!(first.is_some());

        let again = fsm
            .set_animation_if_different(0, "walk", true, PlayOptions::new())
            .unwrap();
        assert!(again.is_none());
        assert_eq!(fsm.get_current(0).map(|e| e.id), first.map(|e| e.id));

        fsm.set_animation(0, "idle", true, PlayOptions::new()).unwrap();
        let switched = fsm
            .set_animation_if_different(0, "walk", true, PlayOptions::new())
            .unwrap();
        assert!(switched.is_some());
        assert!(fsm.is_playing_clip(0, "walk"));
    }

    #[test]
    fn test_walk_clip_lifecycle() {
        let j = journal();
        let walk = recorder("walk", &j);
        let mut fsm = create_fsm();
        fsm.add_state("walk", &walk).unwrap();
        assert!(!walk.is_active());

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        assert!(walk.is_active());

        fsm.update(0.016).unwrap();
        assert_eq!(take(&j), vec!["walk:enter", "walk:update"]);

        fsm.player_mut().clear_track(0);
        fsm.poll_player().unwrap();
        assert!(!walk.is_active());
        assert_eq!(take(&j), vec!["walk:exit"]);
    }

    #[test]
    fn test_interrupt_switches_clip_states() {
        let j = journal();
        let walk = recorder("walk", &j);
        let idle = recorder("idle", &j);
        let mut fsm = create_fsm();
        fsm.add_state("walk", &walk).unwrap();
        fsm.add_state("idle", &idle).unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.set_animation(0, "idle", true, PlayOptions::new()).unwrap();
        assert_eq!(take(&j), vec!["walk:enter", "walk:exit", "idle:enter"]);
    }

    #[test]
    fn test_event_subscribers_fire_in_order() {
        let j = journal();
        let mut fsm = create_fsm();

        let first = Rc::clone(&j);
        let id = fsm
            .subscribe_to_event("footstep", move || first.borrow_mut().push("first".into()))
            .unwrap();
        let second = Rc::clone(&j);
        fsm.subscribe_to_event("footstep", move || second.borrow_mut().push("second".into()))
            .unwrap();

        let entry = fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.handle_notification(PlaybackNotification::Event {
            entry: entry.clone(),
            name: "footstep".to_string(),
        })
        .unwrap();
        assert_eq!(take(&j), vec!["first", "second"]);

        assert!(fsm.unsubscribe_from_event("footstep", id).unwrap());
        assert!(!fsm.unsubscribe_from_event("footstep", id).unwrap());
        fsm.handle_notification(PlaybackNotification::Event {
            entry,
            name: "footstep".to_string(),
        })
        .unwrap();
        assert_eq!(take(&j), vec!["second"]);
        assert_eq!(fsm.event_subscriber_count("footstep"), 1);
    }

    #[test]
    fn test_timeline_events_reach_subscribers() {
        let count = Rc::new(RefCell::new(0));
        let mut fsm = create_fsm();
        let counter = Rc::clone(&count);
        fsm.subscribe_to_event("footstep", move || *counter.borrow_mut() += 1)
            .unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        for _ in 0..40 {
            fsm.player_mut().advance(0.016);
            fsm.update(0.016).unwrap();
        }
        // 0.64 秒内只经过 0.25 处的一次
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_invalid_clip_and_empty_keys() {
        let j = journal();
        let state = recorder("a", &j);
        let mut fsm = create_fsm();

        assert!(matches!(
            fsm.set_animation(0, "run", false, PlayOptions::new()),
            Err(FsmError::InvalidClip { ref clip }) if clip == "run"
        ));
        assert!(matches!(
            fsm.set_alpha("run", 0.5),
            Err(FsmError::InvalidClip { .. })
        ));
        assert!(matches!(
            fsm.set_animation(0, " ", false, PlayOptions::new()),
            Err(FsmError::EmptyName { what: "clip" })
        ));
        assert!(matches!(
            fsm.add_state("", &state),
            Err(FsmError::EmptyName { .. })
        ));
        assert!(matches!(
            fsm.set_condition("  ", true),
            Err(FsmError::EmptyName { what: "condition" })
        ));
        assert!(!state.is_retained());
        assert!(fsm.is_track_empty(0));
    }

    #[test]
    fn test_remove_unregistered_state() {
        let j = journal();
        let state = recorder("a", &j);
        let mut fsm = create_fsm();

        assert!(matches!(
            fsm.remove_global_state(&state),
            Err(FsmError::StateNotFound { .. })
        ));

        fsm.add_conditional_state("ready", &state).unwrap();
        assert!(matches!(
            fsm.remove_state(&state),
            Err(FsmError::StateNotFound { ref key, .. }) if key == "ready"
        ));
        assert!(matches!(
            fsm.conditional_states("missing"),
            Err(FsmError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_update_phase_order() {
        let j = journal();
        let global = recorder("global", &j);
        let conditional = recorder("conditional", &j);
        let clip = recorder("clip", &j);
        let mut fsm = create_fsm();

        fsm.add_state("walk", &clip).unwrap();
        fsm.add_conditional_state("on", &conditional).unwrap();
        fsm.add_global_state(&global).unwrap();
        fsm.set_condition("on", true).unwrap();
        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        take(&j);

        fsm.update(0.016).unwrap();
        assert_eq!(
            take(&j),
            vec!["global:update", "conditional:update", "clip:update"]
        );
    }

    #[test]
    fn test_clip_state_switching_its_own_track() {
        let j = journal();
        let switch = StateHandle::new(SwitchClip {
            to: "idle",
            switched: false,
            journal: Rc::clone(&j),
        });
        let idle = recorder("idle", &j);
        let mut fsm = create_fsm();
        fsm.add_state("walk", &switch).unwrap();
        fsm.add_state("idle", &idle).unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.update(0.016).unwrap();

        assert_eq!(
            take(&j),
            vec!["switch:enter", "switch:update", "switch:exit", "idle:enter"]
        );
        assert!(switch.behavior().switched);
        assert!(idle.is_active());
    }

    #[test]
    fn test_removing_state_during_update() {
        let j = journal();
        let target = Rc::new(RefCell::new(None));
        let remover = StateHandle::new(Remover {
            target: Rc::clone(&target),
            journal: Rc::clone(&j),
        });
        let victim = recorder("victim", &j);
        let mut fsm = create_fsm();

        fsm.add_global_state(&remover).unwrap();
        fsm.add_global_state(&victim).unwrap();
        *target.borrow_mut() = Some(victim.erase());
        take(&j);

        fsm.update(0.016).unwrap();
        assert_eq!(take(&j), vec!["remover:update", "victim:exit"]);
        assert_eq!(fsm.global_states().len(), 1);
        assert!(!victim.is_retained());
    }

    #[test]
    fn test_state_cannot_remove_itself_from_its_hook() {
        let j = journal();
        let target = Rc::new(RefCell::new(None));
        let remover = StateHandle::new(Remover {
            target: Rc::clone(&target),
            journal: Rc::clone(&j),
        });
        let mut fsm = create_fsm();
        fsm.add_global_state(&remover).unwrap();
        *target.borrow_mut() = Some(remover.erase());

        assert!(matches!(
            fsm.update(0.016),
            Err(FsmError::StateBusy { .. })
        ));
        assert!(remover.is_active());
    }

    #[test]
    fn test_track_end_without_notification_exits_state() {
        init_tracing();
        let j = journal();
        let walk = recorder("walk", &j);
        let mut fsm = SpineFsm::new("silent", player().without_end_notifications());
        fsm.add_state("walk", &walk).unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.update(0.016).unwrap();
        fsm.player_mut().clear_track(0);
        fsm.update(0.016).unwrap();

        assert_eq!(take(&j), vec!["walk:enter", "walk:update", "walk:exit"]);
        assert!(!walk.is_active());
        assert!(walk.is_retained());
    }

    #[test]
    fn test_queued_animation_takes_over() {
        let j = journal();
        let walk = recorder("walk", &j);
        let idle = recorder("idle", &j);
        let mut fsm = create_fsm();
        fsm.add_state("walk", &walk).unwrap();
        fsm.add_state("idle", &idle).unwrap();

        fsm.set_animation(0, "walk", false, PlayOptions::new()).unwrap();
        fsm.queue_animation(0, "idle", true, 0.0, PlayOptions::new())
            .unwrap();
        assert!(fsm.is_playing_clip(0, "walk"));

        fsm.player_mut().advance(0.6);
        fsm.update(0.6).unwrap();
        assert!(fsm.is_playing_clip(0, "idle"));
        assert_eq!(
            take(&j),
            vec!["walk:enter", "walk:exit", "idle:enter", "idle:update"]
        );
    }

    #[test]
    fn test_clip_overrides_apply_to_new_entries() {
        let mut fsm = create_fsm();
        fsm.set_time_scale("walk", 2.0).unwrap();

        let entry = fsm
            .set_animation(0, "walk", true, PlayOptions::new().alpha(0.5).mix_duration(-1.0))
            .unwrap();
        assert_eq!(entry.time_scale, 2.0);
        assert_eq!(entry.alpha, 0.5);
        assert_eq!(entry.mix_duration, 0.0);
        assert_eq!(fsm.get_current(0).map(|e| e.time_scale), Some(2.0));
        assert_eq!(fsm.alpha("walk"), Some(0.5));

        fsm.unset_time_scale("walk").unwrap();
        fsm.clear_alphas();
        let entry = fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        assert_eq!(entry.time_scale, 1.0);
        assert_eq!(entry.alpha, 1.0);
    }

    #[test]
    fn test_clip_state_enters_with_overridden_entry() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let walk = StateHandle::new(TrackSnapshot {
            seen: Rc::clone(&seen),
        });
        let mut fsm = create_fsm();
        fsm.add_state("walk", &walk).unwrap();
        fsm.set_time_scale("walk", 2.0).unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new().alpha(0.5))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(2.0, 0.5)]);
        let track = walk.track().unwrap();
        assert_eq!((track.time_scale, track.alpha), (2.0, 0.5));
    }

    #[test]
    fn test_overrides_require_valid_clip() {
        let mut fsm = create_fsm();
        for result in [
            fsm.set_time_scale("run", 2.0),
            fsm.unset_time_scale("run"),
            fsm.unset_alpha("run"),
        ] {
            assert!(matches!(result, Err(FsmError::InvalidClip { ref clip }) if clip == "run"));
        }
        assert_eq!(fsm.time_scale("run"), None);
        assert_eq!(fsm.alpha("run"), None);
    }

    #[test]
    fn test_queue_empty_animation_clamps_negative_values() {
        let mut fsm = create_fsm();
        fsm.set_animation(1, "idle", true, PlayOptions::new()).unwrap();

        let entry = fsm.queue_empty_animation(1, -1.0, -2.0).unwrap();
        assert!(entry.is_empty_animation());
        assert_eq!(entry.mix_duration, 0.0);
        assert_eq!(entry.delay, 0.0);
        assert!(fsm.is_playing_clip(1, "idle"));

        fsm.player_mut().advance(1.0);
        fsm.update(1.0).unwrap();
        assert!(fsm.get_current(1).unwrap().is_empty_animation());
    }

    #[test]
    fn test_clip_playing_on_two_tracks() {
        let j = journal();
        let walk = recorder("walk", &j);
        let mut fsm = create_fsm();
        fsm.add_state("walk", &walk).unwrap();

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.set_animation(1, "walk", true, PlayOptions::new()).unwrap();
        assert_eq!(take(&j), vec!["walk:enter"]);
        assert_eq!(walk.track().unwrap().track_index, 1);

        // 每条播放该片段的轨道各更新一次
        fsm.update(0.016).unwrap();
        assert_eq!(take(&j), vec!["walk:update", "walk:update"]);

        // 任意一条轨道结束都会退出状态，另一条轨道不会重新进入
        fsm.player_mut().clear_track(1);
        fsm.poll_player().unwrap();
        assert_eq!(take(&j), vec!["walk:exit"]);
        assert!(!walk.is_active());

        fsm.update(0.016).unwrap();
        assert!(take(&j).is_empty());
        assert!(fsm.is_playing_clip(0, "walk"));
    }

    #[test]
    fn test_empty_animation_uses_configured_mix() {
        init_tracing();
        let j = journal();
        let idle = recorder("idle", &j);
        let config = FsmConfig {
            empty_mix_duration: 0.5,
            ..FsmConfig::default()
        };
        let mut fsm = SpineFsm::with_config("mix", player(), config);
        fsm.add_state("idle", &idle).unwrap();

        fsm.set_animation(2, "idle", true, PlayOptions::new()).unwrap();
        let entry = fsm.set_empty_animation(2, None).unwrap();
        assert!(entry.is_empty_animation());
        assert_eq!(entry.mix_duration, 0.5);
        assert_eq!(take(&j), vec!["idle:enter", "idle:exit"]);

        fsm.player_mut().advance(0.6);
        fsm.update(0.6).unwrap();
        assert!(fsm.is_track_empty(2));
    }

    #[test]
    fn test_granular_clears_release_states() {
        let j = journal();
        let global = recorder("global", &j);
        let ready = recorder("ready", &j);
        let walk = recorder("walk", &j);
        let mut fsm = create_fsm();
        fsm.add_global_state(&global).unwrap();
        fsm.add_conditional_state("ready", &ready).unwrap();
        fsm.add_state("walk", &walk).unwrap();
        fsm.set_condition("ready", true).unwrap();
        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        take(&j);

        fsm.clear_global_states().unwrap();
        assert_eq!(take(&j), vec!["global:exit"]);
        assert!(!global.is_retained());
        assert!(fsm.global_states().is_empty());
        assert!(ready.is_active());

        fsm.clear_conditional_states().unwrap();
        assert_eq!(take(&j), vec!["ready:exit"]);
        assert!(!ready.is_retained());
        assert!(fsm.get_condition("ready"));

        fsm.clear_states().unwrap();
        assert_eq!(take(&j), vec!["walk:exit"]);
        assert!(!walk.is_retained());
        assert!(fsm.clip_states("walk").is_err());

        // 已清空的状态不会再被更新或重复退出
        fsm.update(0.016).unwrap();
        fsm.clear_all_states().unwrap();
        assert!(take(&j).is_empty());
    }

    #[test]
    fn test_clear_conditions_exits_active_states() {
        let j = journal();
        let a = recorder("a", &j);
        let b = recorder("b", &j);
        let mut fsm = create_fsm();
        fsm.add_conditional_state("a", &a).unwrap();
        fsm.add_conditional_state("b", &b).unwrap();
        fsm.set_condition("b", true).unwrap();
        fsm.set_float("speed", 1.5).unwrap();
        take(&j);

        fsm.clear_conditions().unwrap();
        assert_eq!(take(&j), vec!["b:exit"]);
        assert!(!fsm.get_condition("b"));
        assert!(b.is_retained());
        assert_eq!(fsm.get_float("speed").unwrap(), 1.5);
    }

    #[test]
    fn test_clear_properties_keeps_conditions() {
        let mut fsm = create_fsm();
        fsm.set_int("combo", 3).unwrap();
        fsm.set_string("weapon", "sword").unwrap();
        fsm.set_condition("armed", true).unwrap();

        assert_eq!(fsm.get_int("combo").unwrap(), 3);
        assert_eq!(fsm.get_string("weapon").unwrap(), "sword");
        fsm.clear_properties();

        assert!(!fsm.is_int_defined("combo"));
        assert!(!fsm.is_string_defined("weapon"));
        assert!(matches!(
            fsm.get_float("speed"),
            Err(FsmError::PropertyNotFound { kind: "float", .. })
        ));
        assert!(fsm.get_condition("armed"));
    }

    #[test]
    fn test_clear_all_detaches() {
        let j = journal();
        let global = recorder("global", &j);
        let walk = recorder("walk", &j);
        let mut fsm = create_fsm();
        fsm.add_global_state(&global).unwrap();
        fsm.add_state("walk", &walk).unwrap();
        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        take(&j);

        fsm.clear_all().unwrap();
        let mut exits = take(&j);
        exits.sort();
        assert_eq!(exits, vec!["global:exit", "walk:exit"]);
        assert!(fsm.is_detached());
        assert!(!global.is_retained());

        assert!(matches!(fsm.update(0.016), Err(FsmError::Detached { .. })));
        assert!(matches!(
            fsm.add_global_state(&global),
            Err(FsmError::Detached { .. })
        ));
        assert!(!global.is_retained());
        // 重置后的播放通知被忽略
        fsm.player_mut().clear_track(0);
        fsm.poll_player().unwrap();
        assert!(take(&j).is_empty());
    }

    #[test]
    fn test_mutators_fail_after_clear_all() {
        let j = journal();
        let global = recorder("global", &j);
        let mut fsm = create_fsm();
        fsm.clear_all().unwrap();

        let results = [
            fsm.set_alpha("walk", 0.5),
            fsm.unset_alpha("walk"),
            fsm.set_time_scale("walk", 2.0),
            fsm.unset_time_scale("walk"),
            fsm.set_float("speed", 1.0),
            fsm.set_int("combo", 1),
            fsm.set_string("weapon", "sword"),
            fsm.remove_global_state(&global),
            fsm.remove_conditional_state(&global),
            fsm.remove_state(&global),
        ];
        for result in results {
            assert!(matches!(result, Err(FsmError::Detached { ref fsm }) if fsm == "test"));
        }
        assert_eq!(fsm.alpha("walk"), None);
        assert!(!fsm.is_float_defined("speed"));
        assert!(!fsm.is_int_defined("combo"));
    }

    #[test]
    fn test_logging_mask() {
        let mut fsm = create_fsm();
        assert_eq!(fsm.logging(), LogCategories::ALL);
        fsm.set_logging(LogCategories::STATE_SETUP | LogCategories::EXTERNAL);
        assert!(fsm.logging().contains(LogCategories::EXTERNAL));
        assert!(!fsm.logging().contains(LogCategories::PROPERTIES));
        fsm.log("host message", LogCategories::EXTERNAL);
    }

    // --- 共享上下文 ---

    #[derive(Default)]
    struct Counters {
        entered: u32,
        frames: u32,
    }

    struct Count;

    impl ContextBehavior<Counters> for Count {
        fn on_enter(
            &mut self,
            data: &Shared<Counters>,
            _scope: &mut StateScope<'_>,
        ) -> spine_fsm::Result<()> {
            data.borrow_mut().entered += 1;
            Ok(())
        }

        fn on_update(
            &mut self,
            data: &Shared<Counters>,
            _scope: &mut StateScope<'_>,
            _delta_time: f32,
        ) -> spine_fsm::Result<()> {
            data.borrow_mut().frames += 1;
            Ok(())
        }
    }

    #[test]
    fn test_context_is_injected_on_registration() {
        init_tracing();
        let data = Rc::new(RefCell::new(Counters::default()));
        let mut fsm = ContextFsm::new(Rc::clone(&data), "ctx", player());

        let global = StateHandle::new(ContextState::new(Count));
        let walk = StateHandle::new(ContextState::new(Count));
        assert!(global.behavior().data().is_none());

        fsm.add_global_state(&global).unwrap();
        fsm.add_state("walk", &walk).unwrap();
        assert!(Rc::ptr_eq(global.behavior().data().unwrap(), fsm.data()));

        fsm.set_animation(0, "walk", true, PlayOptions::new()).unwrap();
        fsm.update(0.016).unwrap();

        assert_eq!(data.borrow().entered, 2);
        assert_eq!(data.borrow().frames, 2);
        assert_eq!(global.type_name(), "ContextState<Counters, Count>");
    }

    #[test]
    fn test_context_state_without_context_fails() {
        let state = StateHandle::new(ContextState::<Counters, _>::new(Count));
        let mut fsm = create_fsm();
        assert!(matches!(
            fsm.add_global_state(&state),
            Err(FsmError::MissingContext { .. })
        ));
    }

    #[test]
    fn test_context_not_injected_when_registration_fails() {
        init_tracing();
        let data = Rc::new(RefCell::new(Counters::default()));
        let mut fsm = ContextFsm::new(Rc::clone(&data), "ctx", player());
        let state = StateHandle::new(ContextState::new(Count));

        assert!(matches!(
            fsm.add_conditional_state(" ", &state),
            Err(FsmError::EmptyName { what: "condition" })
        ));
        assert!(matches!(
            fsm.add_state("", &state),
            Err(FsmError::EmptyName { what: "clip" })
        ));
        assert!(state.behavior().data().is_none());
        assert!(!state.is_retained());

        fsm.clear_all().unwrap();
        assert!(matches!(
            fsm.add_global_state(&state),
            Err(FsmError::Detached { .. })
        ));
        assert!(state.behavior().data().is_none());
        assert_eq!(data.borrow().entered, 0);
    }

    #[test]
    fn test_context_not_overwritten_for_retained_state() {
        init_tracing();
        let first = Rc::new(RefCell::new(Counters::default()));
        let second = Rc::new(RefCell::new(Counters::default()));
        let mut a = ContextFsm::new(Rc::clone(&first), "a", player());
        let mut b = ContextFsm::new(Rc::clone(&second), "b", player());

        let state = StateHandle::new(ContextState::new(Count));
        a.add_conditional_state("ready", &state).unwrap();
        assert!(matches!(
            b.add_conditional_state("ready", &state),
            Err(FsmError::AlreadyRetained { .. })
        ));
        assert!(Rc::ptr_eq(state.behavior().data().unwrap(), &first));
    }
}
