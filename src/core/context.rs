//! 共享上下文
//!
//! [`ContextFsm`] 持有一份应用数据，在注册时注入到每个
//! [`ContextState`] 中，所有钩子都能读写同一份数据。

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use super::config::FsmConfig;
use super::error::{FsmError, Result};
use super::player::AnimationPlayer;
use super::runtime::SpineFsm;
use super::state::{StateBehavior, StateHandle, StateScope};
use crate::utils::tool::validate_key;

/// 共享的上下文数据
pub type Shared<T> = Rc<RefCell<T>>;

/// 带上下文的状态行为
pub trait ContextBehavior<T> {
    fn on_enter(&mut self, _data: &Shared<T>, _scope: &mut StateScope<'_>) -> Result<()> {
        Ok(())
    }

    fn on_update(
        &mut self,
        _data: &Shared<T>,
        _scope: &mut StateScope<'_>,
        _delta_time: f32,
    ) -> Result<()> {
        Ok(())
    }

    fn on_exit(&mut self, _data: &Shared<T>, _scope: &mut StateScope<'_>) -> Result<()> {
        Ok(())
    }
}

/// 携带上下文的状态
pub struct ContextState<T, B> {
    data: Option<Shared<T>>,
    behavior: B,
}

impl<T, B> ContextState<T, B> {
    pub fn new(behavior: B) -> Self {
        Self {
            data: None,
            behavior,
        }
    }

    /// 注入的上下文，注册前为 `None`
    pub fn data(&self) -> Option<&Shared<T>> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Shared<T>) {
        self.data = Some(data);
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }
}

fn require<'a, T>(data: &'a Option<Shared<T>>, scope: &StateScope<'_>) -> Result<&'a Shared<T>> {
    data.as_ref().ok_or_else(|| FsmError::MissingContext {
        state: scope.type_name().to_string(),
    })
}

impl<T, B: ContextBehavior<T>> StateBehavior for ContextState<T, B> {
    fn on_enter(&mut self, scope: &mut StateScope<'_>) -> Result<()> {
        let data = require(&self.data, scope)?;
        self.behavior.on_enter(data, scope)
    }

    fn on_update(&mut self, scope: &mut StateScope<'_>, delta_time: f32) -> Result<()> {
        let data = require(&self.data, scope)?;
        self.behavior.on_update(data, scope, delta_time)
    }

    fn on_exit(&mut self, scope: &mut StateScope<'_>) -> Result<()> {
        let data = require(&self.data, scope)?;
        self.behavior.on_exit(data, scope)
    }
}

/// 带共享上下文的状态机
///
/// 其余操作通过 `Deref` 直接使用 [`SpineFsm`]。不带上下文的状态可以经
/// [`ContextFsm::fsm_mut`] 注册。
pub struct ContextFsm<T> {
    fsm: SpineFsm,
    data: Shared<T>,
}

impl<T: 'static> ContextFsm<T> {
    pub fn new(
        data: Shared<T>,
        name: impl Into<String>,
        player: impl AnimationPlayer + 'static,
    ) -> Self {
        Self::with_config(data, name, player, FsmConfig::default())
    }

    pub fn with_config(
        data: Shared<T>,
        name: impl Into<String>,
        player: impl AnimationPlayer + 'static,
        config: FsmConfig,
    ) -> Self {
        Self {
            fsm: SpineFsm::with_config(name, player, config),
            data,
        }
    }

    pub fn data(&self) -> &Shared<T> {
        &self.data
    }

    pub fn fsm(&self) -> &SpineFsm {
        &self.fsm
    }

    pub fn fsm_mut(&mut self) -> &mut SpineFsm {
        &mut self.fsm
    }

    pub fn add_global_state<B: ContextBehavior<T> + 'static>(
        &mut self,
        state: &StateHandle<ContextState<T, B>>,
    ) -> Result<()> {
        self.inject(state)?;
        self.fsm.add_global_state(state)
    }

    pub fn add_conditional_state<B: ContextBehavior<T> + 'static>(
        &mut self,
        condition: &str,
        state: &StateHandle<ContextState<T, B>>,
    ) -> Result<()> {
        validate_key("condition", condition)?;
        self.inject(state)?;
        self.fsm.add_conditional_state(condition, state)
    }

    pub fn add_state<B: ContextBehavior<T> + 'static>(
        &mut self,
        clip: &str,
        state: &StateHandle<ContextState<T, B>>,
    ) -> Result<()> {
        validate_key("clip", clip)?;
        self.inject(state)?;
        self.fsm.add_state(clip, state)
    }

    /// 注册会失败时不覆盖上下文
    fn inject<B>(&self, state: &StateHandle<ContextState<T, B>>) -> Result<()> {
        self.fsm.ensure_attached()?;
        state.ensure_idle()?;
        if state.is_retained() {
            return Err(FsmError::AlreadyRetained {
                state: state.type_name().to_string(),
                owner: state.owner_name().unwrap_or_default(),
            });
        }
        state.behavior_mut().set_data(Rc::clone(&self.data));
        Ok(())
    }
}

impl<T> Deref for ContextFsm<T> {
    type Target = SpineFsm;

    fn deref(&self) -> &SpineFsm {
        &self.fsm
    }
}

impl<T> DerefMut for ContextFsm<T> {
    fn deref_mut(&mut self) -> &mut SpineFsm {
        &mut self.fsm
    }
}
