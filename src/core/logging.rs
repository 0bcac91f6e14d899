//! 日志类别
//!
//! 每个状态机实例持有一个类别掩码，只有命中掩码的消息才会交给 `tracing`。

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use super::error::FsmError;

/// 日志类别位集合
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LogCategories(u32);

impl LogCategories {
    pub const NONE: Self = Self(0);
    /// 状态钩子内部输出的消息
    pub const STATES: Self = Self(1 << 0);
    /// 状态的注册与移除
    pub const STATE_SETUP: Self = Self(1 << 1);
    /// 动画设置（set/queue、alpha、timescale）
    pub const ANIMATION_SETUP: Self = Self(1 << 2);
    /// 条件与属性
    pub const PROPERTIES: Self = Self(1 << 3);
    pub const EVENT_SETUP: Self = Self(1 << 4);
    pub const EVENT_PLAYBACK: Self = Self(1 << 5);
    /// 状态进入/退出
    pub const STATE_PLAYBACK: Self = Self(1 << 6);
    /// 轨道通知（start/interrupt/end）
    pub const ANIMATION_PLAYBACK: Self = Self(1 << 7);
    /// 宿主代码的消息
    pub const EXTERNAL: Self = Self(1 << 8);
    pub const ALL: Self = Self(u32::MAX);

    const NAMED: [(&'static str, Self); 9] = [
        ("states", Self::STATES),
        ("state_setup", Self::STATE_SETUP),
        ("animation_setup", Self::ANIMATION_SETUP),
        ("properties", Self::PROPERTIES),
        ("event_setup", Self::EVENT_SETUP),
        ("event_playback", Self::EVENT_PLAYBACK),
        ("state_playback", Self::STATE_PLAYBACK),
        ("animation_playback", Self::ANIMATION_PLAYBACK),
        ("external", Self::EXTERNAL),
    ];

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `other` 的所有位都在掩码中
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for LogCategories {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogCategories {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for LogCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        if *self == Self::ALL {
            return f.write_str("all");
        }
        let mut first = true;
        for (name, flag) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LogCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogCategories({self}, {:#x})", self.bits())
    }
}

impl FromStr for LogCategories {
    type Err = FsmError;

    /// 接受 `none`、`all` 或以 `,` / `|` 分隔的类别名
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut categories = Self::NONE;
        for part in s.split([',', '|']).map(str::trim).filter(|p| !p.is_empty()) {
            let part = part.to_ascii_lowercase();
            match part.as_str() {
                "none" => {}
                "all" => categories = Self::ALL,
                name => {
                    let (_, flag) = Self::NAMED
                        .iter()
                        .find(|(n, _)| *n == name)
                        .ok_or_else(|| FsmError::UnknownLogCategory(name.to_string()))?;
                    categories |= *flag;
                }
            }
        }
        Ok(categories)
    }
}

/// 向 `tracing` 输出一条状态机日志
pub(crate) fn emit(fsm: &str, category: LogCategories, message: &dyn fmt::Display) {
    if category == LogCategories::EXTERNAL {
        tracing::info!(fsm = %fsm, category = %category, "{}", message);
    } else {
        tracing::debug!(fsm = %fsm, category = %category, "{}", message);
    }
}
