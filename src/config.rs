use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 默认配置文件路径（可通过 `APP_CONFIG_PATH` 覆盖）
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 服务标识配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 健康检查中返回的服务名称
    #[serde(default = "ServiceConfig::default_name")]
    pub name: String,
}

impl ServiceConfig {
    fn default_name() -> String {
        "N.A.I.R AI Background Removal".to_string()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 默认日志过滤指令（`RUST_LOG` 存在时以其为准）
    pub level: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default = "CorsConfig::default_any")]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_any() -> Vec<String> {
        vec!["*".to_string()]
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Self::default_any(),
            allowed_methods: Self::default_any(),
            allowed_headers: Self::default_any(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 请求体最大字节数（multipart 整体大小）
    #[serde(default = "UploadConfig::default_max_bytes")]
    pub max_bytes: usize,
}

impl UploadConfig {
    fn default_max_bytes() -> usize {
        20 * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: Self::default_max_bytes(),
        }
    }
}

/// 推理后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InferenceBackendKind {
    /// ONNX Runtime（支持 GPU 加速）
    #[default]
    Onnx,
    /// Tract（纯 Rust）
    Tract,
}

/// 执行设备
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProviderKind {
    /// 自动选择（CUDA > CoreML > CPU）
    #[default]
    Auto,
    Cpu,
    Cuda,
    CoreMl,
}

/// 背景移除配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// 推理后端
    #[serde(default)]
    pub backend: InferenceBackendKind,
    /// 执行设备
    #[serde(default)]
    pub execution_provider: ExecutionProviderKind,
    /// 模型仓库地址（未设置 model_path 时下载并缓存）
    #[serde(default = "RemovalConfig::default_model_url")]
    pub model_url: String,
    /// 本地模型目录（设置后不再下载）
    #[serde(default)]
    pub model_path: Option<String>,
    /// 模型精度变体（fp16 / fp32，缺省自动选择）
    #[serde(default)]
    pub variant: Option<String>,
    /// 并发处理许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 推理 intra-op 线程数（0=自动）
    #[serde(default)]
    pub intra_threads: usize,
    /// 推理 inter-op 线程数（0=自动）
    #[serde(default)]
    pub inter_threads: usize,
}

impl RemovalConfig {
    fn default_model_url() -> String {
        "https://huggingface.co/imgly/isnet-general-onnx".to_string()
    }

    /// 实际生效的并发许可数
    pub fn effective_parallelism(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get().max(1),
            n => n as usize,
        }
    }
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            backend: InferenceBackendKind::default(),
            execution_provider: ExecutionProviderKind::default(),
            model_url: Self::default_model_url(),
            model_path: None,
            variant: None,
            max_parallel: 0,
            intra_threads: 0,
            inter_threads: 0,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 背景移除配置
    #[serde(default)]
    pub removal: RemovalConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 按“内置默认值 → 配置文件 → 环境变量”的顺序叠加加载配置。
    ///
    /// 配置文件缺失时直接使用默认值；环境变量示例：`APP_SERVER__PORT=8080`。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&Self::default())?)
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("cors.allowed_methods")
                    .with_list_parse_key("cors.allowed_headers")
                    .with_list_parse_key("cors.expose_headers")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取配置文件路径
    pub fn get_config_path() -> PathBuf {
        std::env::var_os("APP_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5001,
            },
            logging: LoggingConfig {
                level: "bgremove_service=info,tower_http=info".to_string(),
            },
            service: ServiceConfig::default(),
            cors: CorsConfig::default(),
            upload: UploadConfig::default(),
            removal: RemovalConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}
