use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use docbay::config::Config;
use docbay::services::{MailTemplate, Mailer};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

/// Seeded admin credentials (must match the initial migration)
const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "password";

const PDF_PAYLOAD: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n%%EOF\n";
const PNG_PAYLOAD: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

/// Mail transport that always fails, counting attempts.
struct FailingMailer {
    attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _recipients: &[String], _template: &MailTemplate) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        false
    }
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.uploads.upload_dir = dir.path().join("uploads").to_string_lossy().to_string();
    config.uploads.template_dir = dir.path().join("templates").to_string_lossy().to_string();
    config
}

async fn spawn_app() -> (Router, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let state = docbay::api::create_app_state_from_config(test_config(&dir), None)
        .await
        .expect("Failed to create app state");
    (docbay::api::router(state).await, dir)
}

async fn spawn_app_with_failing_mailer() -> (Router, TempDir, Arc<FailingMailer>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mailer = Arc::new(FailingMailer {
        attempts: AtomicUsize::new(0),
    });
    let failing: Arc<dyn Mailer> = mailer.clone();
    let state = docbay::api::create_app_state_with_mailer(test_config(&dir), failing, None)
        .await
        .expect("Failed to create app state");
    (docbay::api::router(state).await, dir, mailer)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> StatusCode {
    let payload = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
        "confirm_password": password,
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    response.status()
}

/// Log in and return the session cookie.
async fn login(app: &Router, username: &str, password: &str) -> String {
    let payload = serde_json::json!({ "username": username, "password": password });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "login should succeed");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap();

    cookie.split(';').next().unwrap().to_string()
}

fn multipart_request(uri: &str, cookie: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "X-DOCBAY-TEST-BOUNDARY";

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"document\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

async fn upload(app: &Router, cookie: &str, filename: &str, content: &[u8]) -> axum::response::Response {
    app.clone()
        .oneshot(multipart_request("/api/documents", cookie, filename, content))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let (app, _dir) = spawn_app().await;

    for uri in [
        "/api/documents",
        "/api/auth/me",
        "/api/admin/documents",
        "/api/system/status",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_system_status_with_session() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let cookie = login(&app, "alice", "password123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/status")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["total_documents"], 0);
}

#[tokio::test]
async fn test_register_login_me_flow() {
    let (app, _dir) = spawn_app().await;

    let status = register(&app, "alice", "alice@example.com", "password123").await;
    assert_eq!(status, StatusCode::OK);

    let cookie = login(&app, "alice", "password123").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["is_admin"], false);
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _dir) = spawn_app().await;

    // Password too short
    assert_eq!(
        register(&app, "bob", "bob@example.com", "short").await,
        StatusCode::BAD_REQUEST
    );

    // Mismatched confirmation
    let payload = serde_json::json!({
        "username": "bob",
        "email": "bob@example.com",
        "password": "password123",
        "confirm_password": "password124",
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Bad email format
    assert_eq!(
        register(&app, "bob", "not-an-email", "password123").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_duplicate_registration_is_case_insensitive() {
    let (app, _dir) = spawn_app().await;

    assert_eq!(
        register(&app, "alice", "alice@example.com", "password123").await,
        StatusCode::OK
    );

    // Same name in different case, same email
    assert_eq!(
        register(&app, "ALICE", "alice@example.com", "password123").await,
        StatusCode::CONFLICT
    );

    // Different name, same email in different case
    assert_eq!(
        register(&app, "alice2", "ALICE@EXAMPLE.COM", "password123").await,
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;

    let attempt = |username: &'static str, password: &'static str| {
        let app = app.clone();
        async move {
            let payload = serde_json::json!({ "username": username, "password": password });
            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/auth/login")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(payload.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            body_json(response).await
        }
    };

    let wrong_password = attempt("alice", "wrong-password").await;
    let unknown_user = attempt("nobody", "wrong-password").await;

    assert_eq!(wrong_password["error"], unknown_user["error"]);
}

#[tokio::test]
async fn test_upload_round_trip() {
    let (app, dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let cookie = login(&app, "alice", "password123").await;

    let response = upload(&app, &cookie, "My Report.PDF", PDF_PAYLOAD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let stored_filename = body["data"]["stored_filename"].as_str().unwrap().to_string();
    assert!(stored_filename.ends_with(".pdf"));
    assert!(!stored_filename.contains('/'));
    assert_eq!(body["data"]["original_name"], "My Report.PDF");
    assert_eq!(body["data"]["status"], "Pending Review");
    assert_eq!(
        body["data"]["file_size"].as_i64().unwrap(),
        PDF_PAYLOAD.len() as i64
    );

    // The file exists on disk under the stored name with the recorded size
    let on_disk = dir.path().join("uploads").join(&stored_filename);
    assert_eq!(std::fs::read(&on_disk).unwrap(), PDF_PAYLOAD);

    // The submission shows up in the user's listing
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/documents")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["original_name"], "My Report.PDF");

    // Download serves the original bytes under the display name
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/documents/{stored_filename}/download"))
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("My Report.PDF"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PDF_PAYLOAD);
}

#[tokio::test]
async fn test_upload_rejections_are_stable() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let cookie = login(&app, "alice", "password123").await;

    // Disallowed extension, twice: same outcome both times
    let first = upload(&app, &cookie, "script.sh", b"#!/bin/sh\n").await;
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);
    let first_body = body_json(first).await;

    let second = upload(&app, &cookie, "script.sh", b"#!/bin/sh\n").await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let second_body = body_json(second).await;

    assert_eq!(first_body["error"], second_body["error"]);

    // Content that contradicts its extension is rejected by sniffing
    let response = upload(&app, &cookie, "report.pdf", PNG_PAYLOAD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was recorded for this user
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/documents")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_collision_gets_suffixed_name() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let cookie = login(&app, "alice", "password123").await;

    let first = body_json(upload(&app, &cookie, "report.pdf", PDF_PAYLOAD).await).await;
    let second = body_json(upload(&app, &cookie, "report.pdf", PDF_PAYLOAD).await).await;

    assert_eq!(first["data"]["stored_filename"], "report.pdf");
    assert_eq!(second["data"]["stored_filename"], "report_1.pdf");
}

#[tokio::test]
async fn test_download_denied_for_foreign_documents() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    register(&app, "mallory", "mallory@example.com", "password123").await;

    let alice = login(&app, "alice", "password123").await;
    let body = body_json(upload(&app, &alice, "report.pdf", PDF_PAYLOAD).await).await;
    let stored_filename = body["data"]["stored_filename"].as_str().unwrap().to_string();

    let mallory = login(&app, "mallory", "password123").await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/documents/{stored_filename}/download"))
                .header(header::COOKIE, &mallory)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Same answer as for a document that does not exist at all
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_admin_denied_admin_routes_without_side_effects() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let cookie = login(&app, "alice", "password123").await;

    let body = body_json(upload(&app, &cookie, "report.pdf", PDF_PAYLOAD).await).await;
    let document_id = body["data"]["id"].as_i64().unwrap();

    let payload = serde_json::json!({ "status": "Approved", "message": "self-service" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/documents/{document_id}/status"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &cookie)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The document was not mutated
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/documents")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["status"], "Pending Review");
}

#[tokio::test]
async fn test_admin_status_update_survives_mail_failure() {
    let (app, _dir, mailer) = spawn_app_with_failing_mailer().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    let alice = login(&app, "alice", "password123").await;
    let body = body_json(upload(&app, &alice, "report.pdf", PDF_PAYLOAD).await).await;
    let document_id = body["data"]["id"].as_i64().unwrap();

    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let payload = serde_json::json!({ "status": "Approved", "message": "Looks good" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/documents/{document_id}/status"))
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &admin)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    // The update succeeds even though every mail send failed
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "Approved");
    assert_eq!(body["data"]["notified"], false);
    assert!(mailer.attempts.load(Ordering::SeqCst) > 0);

    // The new status is visible to the owner
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/documents")
                .header(header::COOKIE, &alice)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["status"], "Approved");
}

#[tokio::test]
async fn test_admin_status_update_unknown_document() {
    let (app, _dir) = spawn_app().await;

    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let payload = serde_json::json!({ "status": "Approved", "message": "ghost" });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/documents/9999/status")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, &admin)
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sees_all_documents() {
    let (app, _dir) = spawn_app().await;

    register(&app, "alice", "alice@example.com", "password123").await;
    register(&app, "bob", "bob@example.com", "password123").await;

    let alice = login(&app, "alice", "password123").await;
    upload(&app, &alice, "alice-report.pdf", PDF_PAYLOAD).await;
    let bob = login(&app, "bob", "password123").await;
    upload(&app, &bob, "bob-report.pdf", PDF_PAYLOAD).await;

    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/documents")
                .header(header::COOKIE, &admin)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_template_listing_and_download() {
    let (app, dir) = spawn_app().await;

    let template_dir = dir.path().join("templates");
    std::fs::write(template_dir.join("application-form.pdf"), PDF_PAYLOAD).unwrap();

    // Listing is public
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/templates")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["name"], "application-form.pdf");

    // Download is public and serves the exact file
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/templates/application-form.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], PDF_PAYLOAD);

    // Unknown template
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/templates/nope.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Traversal attempts never reach the filesystem
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/templates/..%2F..%2Fetc%2Fpasswd")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
