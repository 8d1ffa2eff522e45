use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use relay_core::{create_app, AppConfig, AppState, Credential};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";
const MIB: usize = 1024 * 1024;

struct TestContext {
    _temp: TempDir,
    staging_dir: PathBuf,
    server: MockServer,
    state: AppState,
}

async fn setup_with(configure: impl FnOnce(&mut AppConfig)) -> TestContext {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let staging_dir = temp.path().join("staging");

    let mut config = AppConfig::default();
    config.drive.upload_url = format!("{}/upload/drive/v3", server.uri());
    config.drive.folder_id = "folder-1".to_string();
    config.upload.staging_dir = staging_dir.clone();
    config.server.static_dir = temp.path().join("public");
    configure(&mut config);

    let state = AppState::new(config).unwrap();

    TestContext {
        _temp: temp,
        staging_dir,
        server,
        state,
    }
}

async fn setup() -> TestContext {
    setup_with(|_| {}).await
}

fn multipart_body(field: &str, filename: &str, content_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn text_only_body() -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

async fn post_upload(state: &AppState, body: Vec<u8>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = create_app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, serde_json::from_slice(&bytes).unwrap())
}

fn staged_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_unauthorized_upload_is_rejected() {
    let ctx = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let body = multipart_body("imagen", "photo.jpg", "image/jpeg", &vec![b'x'; 2 * MIB]);
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Not authenticated with Google Drive");
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_authorized_upload_is_relayed_to_drive() {
    let ctx = setup().await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(header("authorization", "Bearer ya29.token"))
        .and(body_string_contains(r#""name":"photo.jpg""#))
        .and(body_string_contains(r#""parents":["folder-1"]"#))
        .and(body_string_contains("jpeg-bytes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "abc123", "name": "photo.jpg"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let body = multipart_body("imagen", "photo.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["fileId"], "abc123");
    assert_eq!(json["fileName"], "photo.jpg");
    assert_eq!(json["message"], "File uploaded successfully");
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_minimal_verbosity_body() {
    let ctx = setup_with(|config| {
        config.upload.verbosity = relay_core::Verbosity::Minimal;
    })
    .await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("fields", "id,name"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "abc123", "name": "photo.jpg"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let body = multipart_body("imagen", "photo.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": true, "fileId": "abc123", "fileName": "photo.jpg"})
    );
}

#[tokio::test]
async fn test_drive_error_message_is_surfaced() {
    let ctx = setup().await;
    ctx.state.credentials.set(Credential::new("ya29.expired"));

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": 401,
                "message": "Invalid Credentials",
                "status": "UNAUTHENTICATED",
            }
        })))
        .mount(&ctx.server)
        .await;

    let body = multipart_body("imagen", "photo.jpg", "image/jpeg", b"jpeg-bytes");
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        json!({"success": false, "message": "Error: Invalid Credentials"})
    );
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_missing_file_field() {
    let ctx = setup().await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    let (status, json) = post_upload(&ctx.state, text_only_body()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No file was selected");
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_non_multipart_body_gets_json_error() {
    let ctx = setup().await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"imagen":"photo.jpg"}"#))
        .unwrap();

    let response = create_app(ctx.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().starts_with("Error: "));
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let ctx = setup_with(|config| config.upload.max_file_size_mb = 1).await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let body = multipart_body("imagen", "big.jpg", "image/jpeg", &vec![b'x'; MIB + 1]);
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "File exceeds the maximum size of 1 MiB");
    assert_eq!(staged_entries(&ctx.staging_dir), 0);
}

#[tokio::test]
async fn test_disallowed_content_type_is_rejected() {
    let ctx = setup_with(|config| config.upload.restrict_content_types = true).await;
    ctx.state.credentials.set(Credential::new("ya29.token"));

    let body = multipart_body("imagen", "notes.txt", "text/plain", b"plain text");
    let (status, json) = post_upload(&ctx.state, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "File type text/plain is not allowed");
}

#[tokio::test]
async fn test_health() {
    let ctx = setup().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = create_app(ctx.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "OK");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_index_page_is_served() {
    let ctx = setup().await;
    let static_dir = ctx.state.config.server.static_dir.clone();
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>Upload</h1>").unwrap();

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = create_app(ctx.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>Upload</h1>");
}
