//! Router-level tests for the HTTP endpoints.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use squatcount_common::config::AppConfig;
use squatcount_server::protocol::{ErrorResponse, UploadResponse};
use squatcount_server::{router, AppState};
use squatcount_stream_engine::PoseService;
use tower::ServiceExt;

const BOUNDARY: &str = "squatcount-test-boundary";

fn test_state(dir: &std::path::Path) -> AppState {
    let mut config = AppConfig::default();
    config.server.uploads_dir = dir.join("uploads");
    AppState::new(
        config,
        PoseService::TrackSidecar {
            suffix: ".pose.jsonl".to_string(),
        },
    )
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: video/mp4\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_reports_backend() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(test_state(dir.path()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["pose_backend"], "track");
}

#[tokio::test]
async fn upload_stores_file_under_generated_name() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let uploads = state.uploads.clone();

    let response = router(state)
        .oneshot(upload_request(multipart_body("file", "squat.mp4", b"fake video bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let upload: UploadResponse = serde_json::from_slice(&body).unwrap();
    assert!(upload.filename.ends_with(".mp4"));
    assert_ne!(upload.filename, "squat.mp4");

    let stored = uploads.resolve(&upload.filename).unwrap();
    assert_eq!(std::fs::read(stored).unwrap(), b"fake video bytes");
}

#[tokio::test]
async fn upload_without_file_field_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(test_state(dir.path()))
        .oneshot(upload_request(multipart_body("video", "squat.mp4", b"x")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert!(error.error.contains("file"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(test_state(dir.path()))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
