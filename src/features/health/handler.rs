use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// 服务状态，恒为 running
    #[schema(example = "running")]
    pub status: String,
    /// 服务名称（config `service.name`）
    #[schema(example = "N.A.I.R AI Background Removal")]
    pub service: String,
}

pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

#[utoipa::path(
    get,
    path = "/",
    summary = "健康检查",
    description = "用于探活的健康检查端点，恒返回 running 与服务名称。",
    responses((status = 200, description = "服务运行中", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "running".to_string(),
            service: state.config.service.name.clone(),
        }),
    )
}
