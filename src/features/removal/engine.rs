use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::LocalKey;

use image::DynamicImage;
use imgly_bgremove::{
    BackendType, BackgroundRemovalProcessor, BgRemovalError, ExecutionProvider, ModelSpec,
    OutputFormat, ProcessorConfig, ProcessorConfigBuilder,
};
use thiserror::Error;

use super::backend_factory::ServiceBackendFactory;
use crate::config::{ExecutionProviderKind, InferenceBackendKind, RemovalConfig};

/// 处理链路错误：解码、背景移除、编码三段共用；Display 即对外暴露的原始错误文本。
#[derive(Debug, Error)]
pub enum RemovalError {
    /// 上传内容无法解码为图片
    #[error(transparent)]
    Decode(image::ImageError),

    /// 背景移除库返回失败
    #[error("{0}")]
    Engine(String),

    /// 结果编码为 PNG 失败
    #[error(transparent)]
    Encode(image::ImageError),

    /// 阻塞任务未能正常结束（panic / 被取消）
    #[error("background removal task failed: {0}")]
    Task(String),
}

impl From<BgRemovalError> for RemovalError {
    fn from(err: BgRemovalError) -> Self {
        RemovalError::Engine(err.to_string())
    }
}

/// 背景移除能力的抽象：输入解码后的图片，返回移除背景后的新图片。
///
/// 调用是同步阻塞的，调用方负责把它放到阻塞线程池中执行。
pub trait BackgroundRemover: Send + Sync {
    /// 用于日志的实现名称
    fn name(&self) -> &str;

    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, RemovalError>;
}

/// 基于 imgly-bgremove 的实现。
///
/// 推理后端不是 `Send`，processor 无法跨线程共享；启动时只固化 `ProcessorConfig`，
/// 每个阻塞线程在首次调用时构造并初始化自己的 processor，之后在该线程上复用。
/// 库不会缓存推理会话，每个持有 processor 的线程各占一份模型内存。
pub struct ImglyRemover {
    id: u64,
    processor_config: ProcessorConfig,
    label: String,
}

static NEXT_REMOVER_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_PROCESSOR: RefCell<Option<(u64, BackgroundRemovalProcessor)>> =
        const { RefCell::new(None) };
}

/// 在线程本地槽位上取出（必要时构造）属于 `owner` 的值并执行 `f`。
///
/// 槽位被其他 owner 占用时丢弃旧值重新构造；构造失败时槽位保持为空。
fn with_thread_slot<T: 'static, R>(
    slot: &'static LocalKey<RefCell<Option<(u64, T)>>>,
    owner: u64,
    init: impl FnOnce() -> Result<T, RemovalError>,
    f: impl FnOnce(&mut T) -> Result<R, RemovalError>,
) -> Result<R, RemovalError> {
    slot.with(|cell| {
        let mut cell = cell.borrow_mut();
        if !matches!(cell.as_ref(), Some((id, _)) if *id == owner) {
            *cell = None;
            *cell = Some((owner, init()?));
        }
        match cell.as_mut() {
            Some((_, value)) => f(value),
            None => Err(RemovalError::Engine(
                "thread-local processor slot is empty".to_string(),
            )),
        }
    })
}

impl ImglyRemover {
    pub fn new(model_spec: ModelSpec, settings: &RemovalConfig) -> Result<Self, RemovalError> {
        let label = format!(
            "imgly/{:?}/{}",
            settings.backend,
            model_spec.source.display_name()
        );
        let processor_config = ProcessorConfigBuilder::new()
            .model_spec(model_spec)
            .backend_type(backend_type(settings.backend))
            .execution_provider(execution_provider(settings.execution_provider))
            .output_format(OutputFormat::Png)
            .intra_threads(settings.intra_threads)
            .inter_threads(settings.inter_threads)
            .build()?;

        Ok(Self {
            id: NEXT_REMOVER_ID.fetch_add(1, Ordering::Relaxed),
            processor_config,
            label,
        })
    }
}

impl BackgroundRemover for ImglyRemover {
    fn name(&self) -> &str {
        &self.label
    }

    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, RemovalError> {
        with_thread_slot(
            &THREAD_PROCESSOR,
            self.id,
            || {
                tracing::info!(remover = %self.label, "当前线程初始化推理处理器");
                let mut processor = BackgroundRemovalProcessor::with_factory(
                    self.processor_config.clone(),
                    Box::new(ServiceBackendFactory),
                )?;
                processor.initialize()?;
                Ok(processor)
            },
            |processor| Ok(processor.process_image(&image)?.image),
        )
    }
}

fn backend_type(kind: InferenceBackendKind) -> BackendType {
    match kind {
        InferenceBackendKind::Onnx => BackendType::Onnx,
        InferenceBackendKind::Tract => BackendType::Tract,
    }
}

fn execution_provider(kind: ExecutionProviderKind) -> ExecutionProvider {
    match kind {
        ExecutionProviderKind::Auto => ExecutionProvider::Auto,
        ExecutionProviderKind::Cpu => ExecutionProvider::Cpu,
        ExecutionProviderKind::Cuda => ExecutionProvider::Cuda,
        ExecutionProviderKind::CoreMl => ExecutionProvider::CoreMl,
    }
}
