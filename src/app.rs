use axum::{Router, extract::DefaultBodyLimit};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cors::build_cors_layer;
use crate::features::{health, removal};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由（业务路由 + 文档 + 中间件），`main` 与集成测试共用。
pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::<AppState>::new()
        .merge(health::create_health_router())
        .merge(removal::create_removal_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(config.upload.max_bytes))
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http());

    // CORS 放在最外层，预检请求无需进入业务路由。
    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    app
}
