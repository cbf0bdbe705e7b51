//! HTTP API tests
//!
//! Drive the router in-process, with axum-test for JSON routes and raw
//! `oneshot` requests for multipart uploads. Uploads run against an
//! in-test engine that echoes the image bytes back as text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tower::ServiceExt;

use shelfscan_server::config::{Config, Variant};
use shelfscan_server::ocr::{
    OcrError, OcrProgress, OcrProvider, OcrProviderTrait, OcrResult, OcrService, ProgressSink,
};
use shelfscan_server::storage::{BlobStore, MemoryBlobStore};
use shelfscan_server::{router, AppState};

fn app_with(variant: Variant, blob: Arc<dyn BlobStore>) -> Router {
    let config = Config {
        variant,
        ..Config::default()
    };
    router(AppState::with_parts(config, blob, OcrService::with_providers("eng", vec![])))
}

fn server_with(variant: Variant, blob: Arc<dyn BlobStore>) -> TestServer {
    TestServer::new(app_with(variant, blob)).unwrap()
}

fn registered() -> TestServer {
    server_with(Variant::Registered, Arc::new(MemoryBlobStore::new()))
}

async fn register(server: &TestServer, number: &str, email: &str) -> Value {
    let issued = server
        .post("/api/v1/registrations/request-code")
        .json(&json!({ "number": number, "email": email }))
        .await;
    issued.assert_status_ok();
    let code = issued.json::<Value>()["code"].as_str().unwrap().to_string();

    let verified = server
        .post("/api/v1/registrations/verify")
        .json(&json!({ "code": code }))
        .await;
    verified.assert_status_ok();
    verified.json::<Value>()
}

#[tokio::test]
async fn test_health() {
    let server = registered();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["variant"], "registered");
}

#[tokio::test]
async fn test_extract_text() {
    let server = registered();

    let response = server
        .post("/api/v1/extract/text")
        .json(&json!({ "text": "Dune / Frank Herbert / Ace\nab\n\nEmma" }))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["count"], 2);
    assert_eq!(body["books"][0]["title"], "Dune");
    assert_eq!(body["books"][0]["author"], "Frank Herbert");
    assert_eq!(body["books"][0]["publisher"], "Ace");
    assert_eq!(body["books"][1]["title"], "Emma");
    assert_eq!(body["books"][1]["author"], "");
}

#[tokio::test]
async fn test_registration_round_trip() {
    let server = registered();

    let body = register(&server, " L-100 ", "reader@example.com").await;
    assert_eq!(body["activeLflNumber"], "L-100");
    assert_eq!(body["registrations"][0]["number"], "L-100");
    assert!(body["pending"].is_null());

    let listed = server.get("/api/v1/registrations").await.json::<Value>();
    assert_eq!(listed["registrations"].as_array().unwrap().len(), 1);
    assert_eq!(listed["activeLflNumber"], "L-100");
}

#[tokio::test]
async fn test_wrong_code_keeps_challenge() {
    let server = registered();

    let issued = server
        .post("/api/v1/registrations/request-code")
        .json(&json!({ "number": "L-1", "email": "a@example.com" }))
        .await
        .json::<Value>();
    let code = issued["code"].as_str().unwrap();
    let wrong = if code == "100000" { "100001" } else { "100000" };

    let response = server
        .post("/api/v1/registrations/verify")
        .json(&json!({ "code": wrong }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "code_mismatch");

    let listed = server.get("/api/v1/registrations").await.json::<Value>();
    assert!(listed["registrations"].as_array().unwrap().is_empty());
    assert_eq!(listed["pending"]["number"], "L-1");
}

#[tokio::test]
async fn test_verify_without_challenge() {
    let server = registered();

    let response = server
        .post("/api/v1/registrations/verify")
        .json(&json!({ "code": "123456" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_request_code_requires_both_fields() {
    let server = registered();

    let response = server
        .post("/api/v1/registrations/request-code")
        .json(&json!({ "number": "L-1", "email": "   " }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "missing_fields");
}

#[tokio::test]
async fn test_select_active() {
    let server = registered();
    register(&server, "L-1", "a@example.com").await;
    register(&server, "L-2", "b@example.com").await;

    let response = server
        .put("/api/v1/registrations/active")
        .json(&json!({ "number": "L-1" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["activeLflNumber"], "L-1");

    let unknown = server
        .put("/api/v1/registrations/active")
        .json(&json!({ "number": "L-9" }))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);

    let cleared = server
        .put("/api/v1/registrations/active")
        .json(&json!({ "number": "" }))
        .await;
    cleared.assert_status_ok();
    assert!(cleared.json::<Value>()["activeLflNumber"].is_null());
}

#[tokio::test]
async fn test_registrations_survive_restart() {
    let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

    let first = server_with(Variant::Registered, blob.clone());
    register(&first, "L-7", "c@example.com").await;

    let second = server_with(Variant::Registered, blob);
    let listed = second.get("/api/v1/registrations").await.json::<Value>();
    assert_eq!(listed["registrations"][0]["email"], "c@example.com");
    assert_eq!(listed["activeLflNumber"], "L-7");
}

#[tokio::test]
async fn test_empty_session_history() {
    let server = registered();

    let sessions = server.get("/api/v1/sessions").await.json::<Value>();
    assert!(sessions.as_array().unwrap().is_empty());

    let history = server.get("/api/v1/sessions/history").await.json::<Value>();
    assert!(history.as_array().unwrap().is_empty());

    let download = server.get("/api/v1/sessions/books.json").await;
    download.assert_status_ok();
    assert_eq!(download.text(), "[]");
    let disposition = download.header("content-disposition");
    assert_eq!(disposition.to_str().unwrap(), "attachment; filename=\"books.json\"");
}

#[tokio::test]
async fn test_unknown_session() {
    let server = registered();

    server
        .get("/api/v1/sessions/not-a-uuid")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/v1/sessions/6f1c1c1e-0000-4000-8000-000000000000")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_idle() {
    let server = registered();

    let body = server.get("/api/v1/status").await.json::<Value>();
    assert_eq!(body["busy"], false);
    assert!(body["revision"].is_u64());
}

#[tokio::test]
async fn test_basic_variant_routes() {
    let server = server_with(Variant::Basic, Arc::new(MemoryBlobStore::new()));

    let cards = server.get("/api/v1/ocr/books").await.json::<Value>();
    assert_eq!(cards["resultCount"], "0 books");
    assert!(cards["cards"].as_array().unwrap().is_empty());

    let html = server.get("/api/v1/ocr/cards.html").await;
    html.assert_status_ok();
    assert!(!html.text().is_empty());

    // Registration endpoints only exist in the registered variant
    server
        .get("/api/v1/registrations")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// Reads the "image" bytes as text; `unreadable` fails like a blurry photo
struct EchoProvider;

#[async_trait]
impl OcrProviderTrait for EchoProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        _language: &str,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError> {
        progress.report(OcrProgress::recognizing(0.5));
        if image_data == b"unreadable" {
            return Err(OcrError::ProcessingError("no text found".to_string()));
        }
        Ok(OcrResult {
            text: String::from_utf8_lossy(image_data).into_owned(),
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Registered-variant state with an engine and an active LFL number
fn scanning_state(lfl_number: &str) -> AppState {
    let config = Config {
        variant: Variant::Registered,
        ..Config::default()
    };
    let state = AppState::with_parts(
        config,
        Arc::new(MemoryBlobStore::new()),
        OcrService::with_providers("eng", vec![Arc::new(EchoProvider)]),
    );

    {
        let mut registrations = state.registrations().lock();
        let pending = registrations.request_code(lfl_number, "desk@example.com").unwrap();
        registrations.verify_code(&pending.code).unwrap();
    }
    state
}

fn multipart_request(uri: &str, files: &[(&str, &str, &str)]) -> Request<Body> {
    const BOUNDARY: &str = "shelfscan-test-boundary";

    let mut body = Vec::new();
    for (file_name, content_type, data) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Bytes) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn test_upload_refused_without_active_registration() {
    let app = app_with(Variant::Registered, Arc::new(MemoryBlobStore::new()));
    let (status, bytes) = send(
        &app,
        multipart_request("/api/v1/sessions", &[("shelf.jpg", "image/jpeg", "jpeg bytes")]),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "no_active_registration");
}

#[tokio::test]
async fn test_basic_upload_rejects_non_image() {
    let app = app_with(Variant::Basic, Arc::new(MemoryBlobStore::new()));
    let (status, _) = send(
        &app,
        multipart_request("/api/v1/ocr", &[("notes.txt", "text/plain", "hello")]),
    )
    .await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_waiting_upload_returns_resolved_sessions() {
    let app = router(scanning_state("L-3"));

    let (status, bytes) = send(
        &app,
        multipart_request(
            "/api/v1/sessions?wait=true",
            &[
                ("left.jpg", "image/jpeg", "Dune / Frank Herbert / Ace"),
                ("blurry.jpg", "image/jpeg", "unreadable"),
                ("right.png", "image/png", "Emma / Jane Austen\nxy"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let sessions: Value = serde_json::from_slice(&bytes).unwrap();
    let sessions = sessions.as_array().unwrap();
    let statuses: Vec<_> = sessions.iter().map(|s| s["statusLabel"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["done", "failed", "done"]);

    assert!(sessions.iter().all(|s| s["lflNumber"] == "L-3"));
    assert_eq!(sessions[0]["imageName"], "left.jpg");
    assert_eq!(sessions[0]["books"][0]["publisher"], "Ace");
    assert!(sessions[1]["books"].as_array().unwrap().is_empty());
    assert_eq!(sessions[2]["books"][0]["author"], "Jane Austen");

    let (_, status_bytes) = get(&app, "/api/v1/status").await;
    let indicator: Value = serde_json::from_slice(&status_bytes).unwrap();
    assert_eq!(indicator["busy"], false);
}

#[tokio::test]
async fn test_accepted_upload_completes_in_background() {
    let app = router(scanning_state("L-4"));

    let (status, bytes) = send(
        &app,
        multipart_request(
            "/api/v1/sessions",
            &[
                ("a.jpg", "image/jpeg", "Kokoro / Natsume Soseki"),
                ("b.jpg", "image/jpeg", "Snow Country / Kawabata"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let accepted: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(accepted["accepted"], 2);
    assert_eq!(accepted["lflNumber"], "L-4");

    for _ in 0..100 {
        let (_, bytes) = get(&app, "/api/v1/sessions").await;
        let sessions: Value = serde_json::from_slice(&bytes).unwrap();
        let sessions = sessions.as_array().unwrap();
        if sessions.len() == 2 && sessions.iter().all(|s| s["statusLabel"] == "done") {
            assert_eq!(sessions[0]["books"][0]["title"], "Kokoro");
            assert_eq!(sessions[1]["books"][0]["title"], "Snow Country");
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("background batch never completed");
}

#[tokio::test]
async fn test_preview_serves_uploaded_image() {
    let app = router(scanning_state("L-5"));

    let (_, bytes) = send(
        &app,
        multipart_request(
            "/api/v1/sessions?wait=true",
            &[("cover.png", "image/png", "Norwegian Wood / Murakami")],
        ),
    )
    .await;
    let sessions: Value = serde_json::from_slice(&bytes).unwrap();
    let id = sessions[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/sessions/{}/preview", id);

    // The preview is stored by its own task
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        if response.status() == StatusCode::OK {
            assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(bytes.as_ref(), b"Norwegian Wood / Murakami");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("preview never became available");
}
