//! 工具函数

use crate::core::error::{FsmError, Result};

/// 校验键名（条件名、片段名、事件名）不为空且不全是空白
pub fn validate_key(what: &'static str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(FsmError::EmptyName { what });
    }
    Ok(())
}

/// 把 `std::any::type_name` 的结果缩短为不带模块路径的形式
///
/// 例如 `app::states::ContextState<app::Hero, app::states::Walk>`
/// 变为 `ContextState<Hero, Walk>`。
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    for (i, ch) in full.char_indices() {
        if !(ch.is_alphanumeric() || ch == '_' || ch == ':') {
            push_last_segment(&mut out, &full[segment_start..i]);
            out.push(ch);
            segment_start = i + ch.len_utf8();
        }
    }
    push_last_segment(&mut out, &full[segment_start..]);
    out
}

fn push_last_segment(out: &mut String, path: &str) {
    out.push_str(path.rsplit("::").next().unwrap_or(path));
}
