//! 错误定义

/// 状态机操作的结果类型
pub type Result<T> = std::result::Result<T, FsmError>;

/// 状态机错误
#[derive(Debug, thiserror::Error)]
pub enum FsmError {
    #[error("{what} must not be empty or whitespace")]
    EmptyName { what: &'static str },

    #[error("{clip} is not a valid clip")]
    InvalidClip { clip: String },

    #[error("{state} was already retained by {owner}")]
    AlreadyRetained { state: String, owner: String },

    #[error("{state} is not retained by any state machine")]
    NotRetained { state: String },

    #[error("{state} is retained by {owner}, not by {fsm}")]
    WrongOwner {
        state: String,
        owner: String,
        fsm: String,
    },

    #[error("{state} is already inside a lifecycle call")]
    StateBusy { state: String },

    #[error("{state} was not found under key '{key}' in state machine {fsm}")]
    StateNotFound {
        state: String,
        key: String,
        fsm: String,
    },

    #[error("no states are registered under key '{key}' in state machine {fsm}")]
    KeyNotFound { key: String, fsm: String },

    #[error("{kind} property '{name}' is not defined")]
    PropertyNotFound { kind: &'static str, name: String },

    #[error("null track entry in state {state}")]
    MissingTrack { state: String },

    #[error("shared context was not injected into {state}")]
    MissingContext { state: String },

    #[error("state machine {fsm} was reset and is detached from its player")]
    Detached { fsm: String },

    #[error("unknown log category '{0}'")]
    UnknownLogCategory(String),

    #[error("playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("config error: {0}")]
    Config(#[from] envconfig::Error),
}

/// 播放器（外部动画引擎）报告的错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("animation not found: {name}")]
    UnknownAnimation { name: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

}
