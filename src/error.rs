use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::removal::RemovalError;

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 请求中没有 `file` 上传字段
    #[error("No file uploaded")]
    NoFileUploaded,

    /// `file` 字段存在但文件名为空
    #[error("No file selected")]
    NoFileSelected,

    /// multipart 读取失败（如超出大小限制、报文截断）
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    /// 解码 / 背景移除 / 编码失败，携带原始错误文本
    #[error("{0}")]
    Processing(String),
}

/// 失败时统一返回的状态载荷：`{"success": false, "message": "..."}`
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatusResponse {
    /// 是否成功（错误路径恒为 false）
    #[schema(example = false)]
    pub success: bool,
    /// 人类可读的错误信息
    #[schema(example = "No file uploaded")]
    pub message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoFileUploaded | AppError::NoFileSelected => StatusCode::BAD_REQUEST,
            AppError::Upload { status, .. } => *status,
            AppError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RemovalError> for AppError {
    fn from(err: RemovalError) -> Self {
        AppError::Processing(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = StatusResponse {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
