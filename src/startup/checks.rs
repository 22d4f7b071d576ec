use std::path::PathBuf;
use std::sync::Arc;

use imgly_bgremove::{ModelDownloader, ModelSource, ModelSpec};
use thiserror::Error;

use crate::config::AppConfig;
use crate::features::removal::{BackgroundRemover, ImglyRemover, RemovalError};

/// 启动阶段错误
#[derive(Debug, Error)]
pub enum StartupError {
    /// 本地模型目录不存在
    #[error("模型目录不存在: {0}")]
    ModelPathMissing(PathBuf),

    /// 模型下载 / 缓存失败
    #[error("模型下载失败: {0}")]
    ModelDownload(String),

    /// 背景移除器初始化失败
    #[error("背景移除器初始化失败: {0}")]
    Remover(#[from] RemovalError),
}

/// 执行启动检查并构造背景移除器
///
/// 1. 准备模型（本地目录或下载缓存）
/// 2. 按配置构造推理处理器
pub async fn run_startup_checks(
    config: &AppConfig,
) -> Result<Arc<dyn BackgroundRemover>, StartupError> {
    tracing::info!("🔍 开始执行启动检查...");

    let model_spec = resolve_model_spec(config).await?;
    let remover = ImglyRemover::new(model_spec, &config.removal)?;
    tracing::info!(
        remover = remover.name(),
        max_parallel = config.removal.effective_parallelism(),
        "✅ 启动检查完成"
    );

    Ok(Arc::new(remover))
}

/// 根据配置确定模型来源：优先本地目录，否则下载（已缓存则直接复用）
async fn resolve_model_spec(config: &AppConfig) -> Result<ModelSpec, StartupError> {
    let removal = &config.removal;

    let source = match removal.model_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(StartupError::ModelPathMissing(path));
            }
            tracing::info!("📂 使用本地模型: {:?}", path);
            ModelSource::External(path)
        }
        _ => {
            tracing::info!("📦 准备模型: {}", removal.model_url);
            let downloader =
                ModelDownloader::new().map_err(|e| StartupError::ModelDownload(e.to_string()))?;
            let model_id = downloader
                .download_model(&removal.model_url, false)
                .await
                .map_err(|e| StartupError::ModelDownload(e.to_string()))?;
            tracing::info!("✅ 模型已就绪: {}", model_id);
            ModelSource::Downloaded(model_id)
        }
    };

    Ok(ModelSpec {
        source,
        variant: removal.variant.clone(),
    })
}
