//! 核心状态机框架模块

// 子模块
pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod properties;
pub mod player;
pub mod event;
pub mod state;
pub mod context;
pub mod runtime;

// 重新导出常用类型
pub use types::*;
pub use error::{FsmError, PlaybackError, Result};
pub use logging::LogCategories;
pub use config::FsmConfig;
pub use properties::Properties;
pub use player::{AnimationPlayer, PlayOptions, PlaybackNotification, TrackEntry};
pub use event::{EventCallback, EventSubscribers};
pub use state::{StateBehavior, StateHandle, StateScope};
pub use context::{ContextBehavior, ContextFsm, ContextState, Shared};
pub use runtime::SpineFsm;
