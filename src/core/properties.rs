//! 属性存储
//!
//! 四组互不相干的映射：浮点、整数、字符串，以及布尔集合。
//! 布尔值以“是否在集合中”表示，设为 false 即移除。

use std::collections::{HashMap, HashSet};

use super::error::{FsmError, Result};

/// 类型化的键值属性存储，用于条件和辅助数据
#[derive(Debug, Clone, Default)]
pub struct Properties {
    floats: HashMap<String, f32>,
    ints: HashMap<String, i32>,
    strings: HashMap<String, String>,
    bools: HashSet<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    // floats

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_string(), value);
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        self.try_get_float(name).ok_or_else(|| not_found("float", name))
    }

    pub fn try_get_float(&self, name: &str) -> Option<f32> {
        self.floats.get(name).copied()
    }

    pub fn contains_float(&self, name: &str) -> bool {
        self.floats.contains_key(name)
    }

    // ints

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.ints.insert(name.to_string(), value);
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        self.try_get_int(name).ok_or_else(|| not_found("int", name))
    }

    pub fn try_get_int(&self, name: &str) -> Option<i32> {
        self.ints.get(name).copied()
    }

    pub fn contains_int(&self, name: &str) -> bool {
        self.ints.contains_key(name)
    }

    // strings

    pub fn set_string(&mut self, name: &str, value: impl Into<String>) {
        self.strings.insert(name.to_string(), value.into());
    }

    pub fn get_string(&self, name: &str) -> Result<&str> {
        self.try_get_string(name)
            .ok_or_else(|| not_found("string", name))
    }

    pub fn try_get_string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    pub fn contains_string(&self, name: &str) -> bool {
        self.strings.contains_key(name)
    }

    // bools

    /// 设为 true 时加入集合，设为 false 时移除；已处于目标状态则什么都不做
    pub fn set_bool(&mut self, name: &str, value: bool) {
        if value {
            if !self.bools.contains(name) {
                self.bools.insert(name.to_string());
            }
        } else {
            self.bools.remove(name);
        }
    }

    /// 不存在即为 false
    pub fn get_bool(&self, name: &str) -> bool {
        self.bools.contains(name)
    }

    /// 存在时返回 `Some(true)`
    pub fn try_get_bool(&self, name: &str) -> Option<bool> {
        self.bools.contains(name).then_some(true)
    }

    pub fn contains_bool(&self, name: &str) -> bool {
        self.bools.contains(name)
    }

    /// 当前为 true 的布尔名
    pub fn true_bools(&self) -> impl Iterator<Item = &str> {
        self.bools.iter().map(String::as_str)
    }

    // clear

    pub fn clear(&mut self) {
        self.bools.clear();
        self.floats.clear();
        self.ints.clear();
        self.strings.clear();
    }

    pub fn clear_floats(&mut self) {
        self.floats.clear();
    }

    pub fn clear_ints(&mut self) {
        self.ints.clear();
    }

    pub fn clear_strings(&mut self) {
        self.strings.clear();
    }

    pub fn clear_bools(&mut self) {
        self.bools.clear();
    }
}

fn not_found(kind: &'static str, name: &str) -> FsmError {
    FsmError::PropertyNotFound {
        kind,
        name: name.to_string(),
    }
}
