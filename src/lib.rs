/// 路由组装
pub mod app;

/// 配置模块
pub mod config;

/// CORS 中间件构建
pub mod cors;

/// 统一错误处理模块
pub mod error;

/// 功能聚合模块
pub mod features;

/// OpenAPI 文档
pub mod openapi;

/// 请求 ID 中间件
pub mod request_id;

/// 优雅退出管理模块
pub mod shutdown;

/// 启动检查模块（模型准备）
pub mod startup;

/// 应用状态聚合模块
pub mod state;

// 导出常用类型供外部使用
pub use app::build_app;
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::AppState;
