use imgly_bgremove::backends::{OnnxBackend, TractBackend};
use imgly_bgremove::{BackendFactory, BackendType, InferenceBackend, ModelManager};

/// 为服务注入 ONNX / Tract 推理后端的工厂。
///
/// 库自带的默认工厂不提供任何后端，必须由调用方注入。
#[derive(Debug, Default)]
pub(crate) struct ServiceBackendFactory;

impl BackendFactory for ServiceBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> imgly_bgremove::Result<Box<dyn InferenceBackend>> {
        tracing::debug!(?backend_type, "创建推理后端");
        match backend_type {
            BackendType::Onnx => Ok(Box::new(OnnxBackend::with_model_manager(model_manager))),
            BackendType::Tract => Ok(Box::new(TractBackend::with_model_manager(model_manager))),
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        vec![BackendType::Onnx, BackendType::Tract]
    }
}
