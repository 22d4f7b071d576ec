/// 健康检查
pub mod health;

/// 背景移除
pub mod removal;
