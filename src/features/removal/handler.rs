use std::time::Instant;

use axum::{
    Router,
    Extension,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};

use super::codec::remove_background_to_png;
use super::engine::RemovalError;
use super::upload::find_file_field;
use crate::{error::AppError, request_id::RequestId, state::AppState};

/// multipart 上传表单（仅用于 OpenAPI 文档）
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct RemoveBgUpload {
    /// 待处理的图片文件（JPEG / PNG / WebP / BMP / TIFF 等）
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

pub fn create_removal_router() -> Router<AppState> {
    Router::new().route("/remove-bg", post(remove_bg))
}

#[utoipa::path(
    post,
    path = "/remove-bg",
    summary = "移除图片背景",
    description = "上传一张图片（multipart 字段 `file`），返回移除背景后的 PNG 字节流。",
    request_body(content = RemoveBgUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "移除背景后的 PNG", body = [u8], content_type = "image/png"),
        (status = 400, description = "未上传文件或文件名为空", body = crate::error::StatusResponse),
        (status = 413, description = "上传内容超出大小限制", body = crate::error::StatusResponse),
        (status = 500, description = "解码 / 背景移除 / 编码失败", body = crate::error::StatusResponse)
    ),
    tag = "Removal"
)]
pub async fn remove_bg(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("请求体不是有效的 multipart 表单: {}", e);
        AppError::NoFileUploaded
    })?;

    // 仅超限单独报告，其余读取失败等同于没有可用的 file 字段
    let upload = find_file_field(&mut multipart).await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::Upload {
                status: e.status(),
                message: e.body_text(),
            }
        } else {
            tracing::debug!("multipart 表单读取失败: {}", e);
            AppError::NoFileUploaded
        }
    })?;
    let Some(file) = upload else {
        return Err(AppError::NoFileUploaded);
    };
    if file.file_name.is_empty() {
        return Err(AppError::NoFileSelected);
    }

    tracing::info!(
        request_id = request_id.as_str(),
        file_name = %file.file_name,
        content_type = file.content_type.as_deref().unwrap_or("-"),
        bytes = file.bytes.len(),
        "收到背景移除请求"
    );

    let t_wait = Instant::now();
    let _permit = state
        .removal_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Processing(e.to_string()))?;
    let wait_ms = t_wait.elapsed().as_millis();

    // 解码 / 推理 / 编码均为 CPU 密集的阻塞操作，必须移出 tokio worker。
    let t_process = Instant::now();
    let remover = state.remover.clone();
    let span = tracing::Span::current();
    let result = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        remove_background_to_png(remover.as_ref(), &file.bytes)
    })
    .await
    .unwrap_or_else(|e| Err(RemovalError::Task(e.to_string())));

    match result {
        Ok(png) => {
            tracing::info!(
                request_id = request_id.as_str(),
                wait_ms,
                process_ms = t_process.elapsed().as_millis(),
                output_bytes = png.len(),
                "背景移除完成"
            );
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static("image/png"))],
                png,
            )
                .into_response())
        }
        Err(e) => {
            tracing::error!("Error processing image: {}", e);
            Err(e.into())
        }
    }
}
