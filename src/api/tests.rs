use super::*;
use crate::config::{FetchConfig, RetryConfig};
use crate::relay::test_helpers::RecordingSender;
use crate::types::ParseMode;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot()
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Router wired to a recording sender and a scratch TempDir
async fn test_router(sender: Arc<RecordingSender>) -> (Router, TempDir) {
    let scratch = TempDir::new().unwrap();
    let config = Arc::new(Config {
        fetch: FetchConfig {
            scratch_dir: scratch.path().to_path_buf(),
            probe_timeout: Duration::from_secs(2),
            ..FetchConfig::default()
        },
        retry: RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            jitter: false,
        },
        ..Config::default()
    });

    let relay = Arc::new(Relay::with_sender(&config, sender).await.unwrap());
    (create_router(relay, config), scratch)
}

/// Mock media host serving a small video on every GET
async fn media_host() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "video/mp4"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(b"clip bytes".to_vec()),
        )
        .mount(&server)
        .await;
    server
}

fn post_upload(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn upload_happy_path_returns_message_id() {
    let server = media_host().await;
    let sender = Arc::new(RecordingSender::succeeding(42));
    let (app, _scratch) = test_router(sender.clone()).await;

    let response = app
        .oneshot(post_upload(json!({
            "chat_id": "@channel",
            "file_url": format!("{}/clip.mp4", server.uri()),
            "caption": "hi",
            "parse_mode": "HTML",
            "kind": "video"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["message_id"], 42);

    let calls = sender.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].destination, "@channel");
    assert_eq!(calls[0].parse_mode, ParseMode::Html);
}

#[tokio::test]
async fn upload_accepts_url_alias_and_defaults() {
    let server = media_host().await;
    let sender = Arc::new(RecordingSender::succeeding(7));
    let (app, _scratch) = test_router(sender.clone()).await;

    let response = app
        .oneshot(post_upload(json!({
            "chat_id": "12345",
            "url": format!("{}/clip.mp4", server.uri())
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let calls = sender.calls.lock().await;
    assert_eq!(calls[0].operation, "sendVideo", "kind defaults to video");
    assert_eq!(calls[0].caption, None);
}

#[tokio::test]
async fn upload_with_invalid_scheme_is_a_400() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender.clone()).await;

    let response = app
        .oneshot(post_upload(json!({
            "chat_id": "@channel",
            "file_url": "ftp://example.com/clip.mp4"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(sender.calls.lock().await.is_empty());
}

#[tokio::test]
async fn upload_without_url_is_a_400() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(post_upload(json!({ "chat_id": "@channel" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("file_url")
    );
}

#[tokio::test]
async fn upload_failure_is_a_500_with_envelope() {
    let server = media_host().await;
    let sender = Arc::new(RecordingSender::failing("Bad Request: chat not found"));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(post_upload(json!({
            "chat_id": "@channel",
            "file_url": format!("{}/clip.mp4", server.uri())
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "upload_error");
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("chat not found")
    );
}

#[tokio::test]
async fn download_failure_is_a_500_with_download_failed_code() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(post_upload(json!({
            "chat_id": "@channel",
            "file_url": format!("{}/missing.mp4", server.uri())
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "download_failed");
    assert_eq!(body["error"]["details"]["attempts"], 2);
}

#[tokio::test]
async fn liveness_answers_on_root() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn liveness_answers_head_requests() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("HEAD")
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_version() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["paths"]["/upload"].is_object());
}

#[tokio::test]
async fn cors_headers_are_present_when_enabled() {
    let sender = Arc::new(RecordingSender::succeeding(1));
    let (app, _scratch) = test_router(sender).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn api_server_binds_and_serves() {
    let scratch = TempDir::new().unwrap();
    let mut config = Config {
        fetch: FetchConfig {
            scratch_dir: scratch.path().to_path_buf(),
            ..FetchConfig::default()
        },
        ..Config::default()
    };
    // Port 0 = OS assigns a free port
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let sender = Arc::new(RecordingSender::succeeding(1));
    let relay = Arc::new(Relay::with_sender(&config, sender).await.unwrap());

    let server_handle = tokio::spawn(start_api_server(relay, config));

    // Give it a moment to start, then stop it
    tokio::time::sleep(Duration::from_millis(100)).await;
    server_handle.abort();
}
