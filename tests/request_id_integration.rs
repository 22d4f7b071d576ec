use std::io::Cursor;
use std::sync::{Arc, Mutex, Once};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tower::ServiceExt;

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

fn build() -> Router {
    build_app(AppState::new(
        Arc::new(AppConfig::default()),
        Arc::new(Passthrough),
    ))
}

fn request_id_of(resp: &axum::response::Response) -> String {
    resp.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let resp = build()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .expect("request /");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(request_id_of(&resp).starts_with("req_"));
}

#[tokio::test]
async fn request_id_uses_client_value_when_valid() {
    let resp = build()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /");

    assert_eq!(request_id_of(&resp), "client.req-001");
}

#[tokio::test]
async fn invalid_client_request_id_is_replaced() {
    let resp = build()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "has spaces/and slashes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /");

    let id = request_id_of(&resp);
    assert_ne!(id, "has spaces/and slashes");
    assert!(id.starts_with("req_"));
}

#[tokio::test]
async fn error_responses_also_carry_request_id() {
    let resp = build()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/remove-bg")
                .header(header::CONTENT_TYPE, "text/plain")
                .header("x-request-id", "err.req-001")
                .body(Body::from("nope"))
                .unwrap(),
        )
        .await
        .expect("request /remove-bg");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(request_id_of(&resp), "err.req-001");
}

/// 记录 remove 调用时所在的 span
#[derive(Default)]
struct SpanRecorder {
    seen: Mutex<Vec<(Option<&'static str>, bool)>>,
}

impl BackgroundRemover for SpanRecorder {
    fn name(&self) -> &str {
        "span-recorder"
    }

    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, RemovalError> {
        let span = tracing::Span::current();
        let name = span.metadata().map(|m| m.name());
        let has_request_id = span.field("request_id").is_some();
        self.seen
            .lock()
            .expect("recorder lock")
            .push((name, has_request_id));
        Ok(image)
    }
}

fn install_subscriber() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing::subscriber::set_global_default(tracing_subscriber::registry())
            .expect("install subscriber");
    });
}

#[tokio::test]
async fn blocking_removal_runs_inside_request_span() {
    install_subscriber();
    let recorder = Arc::new(SpanRecorder::default());
    let app = build_app(AppState::new(
        Arc::new(AppConfig::default()),
        recorder.clone(),
    ));

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 255])))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .expect("encode fixture png");
    let boundary = "span-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blue.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/remove-bg")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header("x-request-id", "span.req-001")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .expect("request /remove-bg");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(request_id_of(&resp), "span.req-001");
    let seen = recorder.seen.lock().expect("recorder lock");
    assert_eq!(seen.as_slice(), &[(Some("request"), true)]);
}
