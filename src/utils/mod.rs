//! 辅助工具

pub mod tool;
pub mod scripted_player;
