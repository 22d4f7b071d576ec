use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, header},
    routing::get,
};
use image::DynamicImage;
use tower::ServiceExt;

use bgremove_service::config::CorsConfig;
use bgremove_service::cors::build_cors_layer;
use bgremove_service::features::removal::{BackgroundRemover, RemovalError};
use bgremove_service::{AppConfig, AppState, build_app};

struct Passthrough;

impl BackgroundRemover for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, RemovalError> {
        Ok(image)
    }
}

fn default_app() -> Router {
    build_app(AppState::new(
        Arc::new(AppConfig::default()),
        Arc::new(Passthrough),
    ))
}

#[tokio::test]
async fn any_origin_is_permitted_by_default() {
    let req = Request::builder()
        .method("GET")
        .uri("/")
        .header(header::ORIGIN, "https://some-frontend.example")
        .body(Body::empty())
        .expect("build request");
    let resp = default_app().oneshot(req).await.expect("call app");

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("missing allow origin")
        .to_str()
        .expect("invalid allow origin");
    assert_eq!(allow_origin, "*");
}

#[tokio::test]
async fn preflight_for_remove_bg_is_answered() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/remove-bg")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .expect("build request");
    let resp = default_app().oneshot(req).await.expect("call app");

    assert!(resp.status().is_success());
    assert!(
        resp.headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS)
    );
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn allow_list_echoes_matching_origin() {
    let cors = CorsConfig {
        allowed_origins: vec!["https://example.com".to_string()],
        allowed_methods: vec!["GET".to_string(), "POST".to_string()],
        allowed_headers: vec!["Content-Type".to_string()],
        ..CorsConfig::default()
    };

    let layer = build_cors_layer(&cors).expect("cors layer");
    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(layer);

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("missing allow origin")
        .to_str()
        .expect("invalid allow origin");
    assert_eq!(allow_origin, "https://example.com");
    let allow_methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .expect("missing allow methods")
        .to_str()
        .expect("invalid allow methods");
    assert!(allow_methods.contains("POST"));
}
