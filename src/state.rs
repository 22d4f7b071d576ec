use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::features::removal::BackgroundRemover;

/// 聚合的应用共享状态：进程启动时构造一次，经 axum `State` 显式传给各 handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub remover: Arc<dyn BackgroundRemover>,
    /// 控制并发背景移除的信号量（限制 CPU 密集型任务数量）
    pub removal_permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, remover: Arc<dyn BackgroundRemover>) -> Self {
        let permits = config.removal.effective_parallelism();
        Self {
            config,
            remover,
            removal_permits: Arc::new(Semaphore::new(permits)),
        }
    }
}
