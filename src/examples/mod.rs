//! 示例

pub mod player_movement;
