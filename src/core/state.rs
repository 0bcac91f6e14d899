//! 状态机状态
//!
//! 一个状态由两部分组成：由状态机维护的生命周期记录（持有者、键、
//! 是否激活、当前轨道条目），以及调用方提供的行为（[`StateBehavior`]）。
//! 应用代码通过 [`StateHandle`] 创建并持有状态，注册时状态机持有同一个
//! 状态的另一份句柄。
//!
//! 生命周期：
//!
//! ```text
//! 未持有 --retain--> 已持有/未激活 --enter--> 激活
//!   ^                     |   ^                  |
//!   +------release--------+   +------exit--------+
//! ```
//!
//! `release` 在状态激活时先执行完整的退出流程。重复的 `enter`/`exit`、
//! 未激活时的 `update` 都是空操作。

use std::any::type_name;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::error::{FsmError, Result};
use super::logging::LogCategories;
use super::player::TrackEntry;
use super::runtime::SpineFsm;
use super::types::FsmId;
use crate::utils::tool::short_type_name;

/// 状态行为：三个可覆盖的钩子，默认什么都不做
pub trait StateBehavior {
    fn on_enter(&mut self, _scope: &mut StateScope<'_>) -> Result<()> {
        Ok(())
    }

    fn on_update(&mut self, _scope: &mut StateScope<'_>, _delta_time: f32) -> Result<()> {
        Ok(())
    }

    fn on_exit(&mut self, _scope: &mut StateScope<'_>) -> Result<()> {
        Ok(())
    }
}

/// 持有该状态的状态机（非拥有引用）
#[derive(Debug, Clone)]
struct Owner {
    id: FsmId,
    name: String,
}

/// 由状态机维护的生命周期记录
#[derive(Debug, Default)]
struct StateCore {
    owner: Option<Owner>,
    key: Option<String>,
    active: bool,
    track: Option<TrackEntry>,
}

impl StateCore {
    fn ensure_owned_by(&self, fsm: &SpineFsm, type_name: &str) -> Result<()> {
        match &self.owner {
            None => Err(FsmError::NotRetained {
                state: type_name.to_string(),
            }),
            Some(owner) if owner.id != fsm.id() => Err(FsmError::WrongOwner {
                state: type_name.to_string(),
                owner: owner.name.clone(),
                fsm: fsm.name().to_string(),
            }),
            Some(_) => Ok(()),
        }
    }
}

struct FsmState<B: ?Sized> {
    core: StateCore,
    behavior: B,
}

struct StateSlot<B: ?Sized> {
    type_name: String,
    state: RefCell<FsmState<B>>,
}

#[derive(Clone, Copy)]
enum Step {
    Enter,
    Update(f32),
    Exit,
}

/// 钩子执行时可见的上下文
pub struct StateScope<'a> {
    fsm: &'a mut SpineFsm,
    core: &'a StateCore,
    type_name: &'a str,
}

impl StateScope<'_> {
    /// 持有该状态的状态机
    pub fn fsm(&mut self) -> &mut SpineFsm {
        &mut *self.fsm
    }

    /// 注册时使用的键（全局标记、条件名或片段名）
    pub fn key(&self) -> &str {
        self.core.key.as_deref().unwrap_or_default()
    }

    /// 片段状态的当前轨道条目
    pub fn track(&self) -> Result<&TrackEntry> {
        self.core.track.as_ref().ok_or_else(|| FsmError::MissingTrack {
            state: self.type_name.to_string(),
        })
    }

    pub fn type_name(&self) -> &str {
        self.type_name
    }

    /// 以 `STATES` 类别输出日志
    pub fn log(&self, message: impl fmt::Display) {
        self.fsm.log(
            format_args!("{}: {}", self.type_name, message),
            LogCategories::STATES,
        );
    }
}

/// 状态句柄
///
/// 克隆句柄不会复制状态。`B` 默认为类型擦除后的 `dyn StateBehavior`，
/// 状态机内部保存的就是擦除后的句柄；应用代码通常保留具体类型的句柄，
/// 以便读取自己的行为数据。
pub struct StateHandle<B: ?Sized = dyn StateBehavior> {
    slot: Rc<StateSlot<B>>,
}

impl<B: ?Sized> Clone for StateHandle<B> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<B: StateBehavior + 'static> StateHandle<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            slot: Rc::new(StateSlot {
                type_name: short_type_name(type_name::<B>()),
                state: RefCell::new(FsmState {
                    core: StateCore::default(),
                    behavior,
                }),
            }),
        }
    }

    /// 擦除行为类型，得到指向同一状态的句柄
    pub fn erase(&self) -> StateHandle {
        let slot: Rc<StateSlot<dyn StateBehavior>> = self.slot.clone();
        StateHandle { slot }
    }
}

impl<B: ?Sized> StateHandle<B> {
    /// 两个句柄是否指向同一个状态
    pub fn ptr_eq<C: ?Sized>(&self, other: &StateHandle<C>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.slot), Rc::as_ptr(&other.slot))
    }

    /// 行为类型名（不含模块路径）
    pub fn type_name(&self) -> &str {
        &self.slot.type_name
    }

    /// # Panics
    ///
    /// 在该状态自己的钩子执行期间调用会 panic。以下访问器同理。
    pub fn is_active(&self) -> bool {
        self.slot.state.borrow().core.active
    }

    pub fn is_retained(&self) -> bool {
        self.slot.state.borrow().core.owner.is_some()
    }

    pub fn key(&self) -> Option<String> {
        self.slot.state.borrow().core.key.clone()
    }

    /// 最近一次传入的轨道条目
    pub fn track(&self) -> Option<TrackEntry> {
        self.slot.state.borrow().core.track.clone()
    }

    /// 持有者状态机的名字
    pub fn owner_name(&self) -> Option<String> {
        self.slot
            .state
            .borrow()
            .core
            .owner
            .as_ref()
            .map(|o| o.name.clone())
    }

    pub fn behavior(&self) -> Ref<'_, B> {
        Ref::map(self.slot.state.borrow(), |s| &s.behavior)
    }

    pub fn behavior_mut(&self) -> RefMut<'_, B> {
        RefMut::map(self.slot.state.borrow_mut(), |s| &mut s.behavior)
    }

    /// 是否由给定状态机持有。钩子执行中的状态视为持有
    pub(crate) fn is_retained_by(&self, fsm: &SpineFsm) -> bool {
        match self.slot.state.try_borrow() {
            Ok(state) => state.core.owner.as_ref().is_some_and(|o| o.id == fsm.id()),
            Err(_) => true,
        }
    }

    pub(crate) fn is_active_unchecked(&self) -> bool {
        self.slot
            .state
            .try_borrow()
            .map(|s| s.core.active)
            .unwrap_or(false)
    }

    /// 确认当前没有钩子在执行
    pub(crate) fn ensure_idle(&self) -> Result<()> {
        self.borrow_mut().map(drop)
    }

    fn borrow_mut(&self) -> Result<RefMut<'_, FsmState<B>>> {
        self.slot
            .state
            .try_borrow_mut()
            .map_err(|_| FsmError::StateBusy {
                state: self.slot.type_name.clone(),
            })
    }
}

impl<B: StateBehavior + ?Sized> StateHandle<B> {
    /// 由状态机持有，记录持有者和键
    pub fn retain(&self, fsm: &SpineFsm, key: &str) -> Result<()> {
        let mut state = self.borrow_mut()?;
        if let Some(owner) = &state.core.owner {
            return Err(FsmError::AlreadyRetained {
                state: self.slot.type_name.clone(),
                owner: owner.name.clone(),
            });
        }
        state.core.owner = Some(Owner {
            id: fsm.id(),
            name: fsm.name().to_string(),
        });
        state.core.key = Some(key.to_string());
        Ok(())
    }

    /// 解除持有。激活中的状态先执行退出钩子；未被持有时什么都不做
    pub fn release(&self, fsm: &mut SpineFsm) -> Result<()> {
        {
            let state = self.borrow_mut()?;
            if state.core.owner.is_none() {
                return Ok(());
            }
            state.core.ensure_owned_by(fsm, &self.slot.type_name)?;
        }

        let exited = self.run(fsm, None, Step::Exit);

        if let Ok(mut state) = self.slot.state.try_borrow_mut() {
            state.core.active = false;
            state.core.owner = None;
            state.core.key = None;
            state.core.track = None;
        }
        exited
    }

    pub fn enter(&self, fsm: &mut SpineFsm) -> Result<()> {
        self.run(fsm, None, Step::Enter)
    }

    pub fn update(&self, fsm: &mut SpineFsm, delta_time: f32) -> Result<()> {
        self.run(fsm, None, Step::Update(delta_time))
    }

    pub fn exit(&self, fsm: &mut SpineFsm) -> Result<()> {
        self.run(fsm, None, Step::Exit)
    }

    /// 片段状态版本：先刷新轨道条目再进入
    pub fn enter_track(&self, fsm: &mut SpineFsm, track: &TrackEntry) -> Result<()> {
        self.run(fsm, Some(track), Step::Enter)
    }

    pub fn update_track(
        &self,
        fsm: &mut SpineFsm,
        track: &TrackEntry,
        delta_time: f32,
    ) -> Result<()> {
        self.run(fsm, Some(track), Step::Update(delta_time))
    }

    pub fn exit_track(&self, fsm: &mut SpineFsm, track: &TrackEntry) -> Result<()> {
        self.run(fsm, Some(track), Step::Exit)
    }

    fn run(&self, fsm: &mut SpineFsm, track: Option<&TrackEntry>, step: Step) -> Result<()> {
        let type_name = self.slot.type_name.as_str();
        let hook_result = {
            let mut guard = self.borrow_mut()?;
            let state = &mut *guard;
            state.core.ensure_owned_by(fsm, type_name)?;
            if let Some(track) = track {
                state.core.track = Some(track.clone());
            }

            match step {
                Step::Enter => {
                    if state.core.active {
                        return Ok(());
                    }
                    state.core.active = true;
                    fsm.log(
                        format_args!("Enter State {} ({})", type_name, key_of(&state.core)),
                        LogCategories::STATE_PLAYBACK,
                    );
                }
                Step::Update(_) => {
                    if !state.core.active {
                        return Ok(());
                    }
                }
                Step::Exit => {
                    if !state.core.active {
                        return Ok(());
                    }
                    state.core.active = false;
                    fsm.log(
                        format_args!("Exit State {} ({})", type_name, key_of(&state.core)),
                        LogCategories::STATE_PLAYBACK,
                    );
                }
            }

            fsm.enter_hook();
            let mut scope = StateScope {
                fsm: &mut *fsm,
                core: &state.core,
                type_name,
            };
            let result = match step {
                Step::Enter => state.behavior.on_enter(&mut scope),
                Step::Update(delta_time) => state.behavior.on_update(&mut scope, delta_time),
                Step::Exit => state.behavior.on_exit(&mut scope),
            };
            fsm.leave_hook();
            result
        };

        hook_result?;
        // 钩子期间产生的播放通知在这里派发
        fsm.poll_player()
    }
}

fn key_of(core: &StateCore) -> &str {
    core.key.as_deref().unwrap_or_default()
}

impl<B: ?Sized> fmt::Debug for StateHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("StateHandle");
        out.field("type_name", &self.slot.type_name);
        match self.slot.state.try_borrow() {
            Ok(state) => out
                .field("key", &state.core.key)
                .field("active", &state.core.active)
                .field("retained", &state.core.owner.is_some()),
            Err(_) => out.field("busy", &true),
        };
        out.finish()
    }
}
