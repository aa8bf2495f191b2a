//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router, backed by the in-memory repository. Profile storage follows the
//! config: inline by default, disk when `upload_dir` is set.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use roster_server::api::{create_router, AppState};
use roster_server::config::Config;
use roster_server::db::MemoryUserRepository;
use roster_server::storage;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "----RosterTestBoundary";

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app with in-memory records and inline profile images.
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    /// Create a test app with a custom config (for limit and storage testing).
    pub async fn with_config(config: Config) -> Self {
        let repo = Arc::new(MemoryUserRepository::new());
        let profiles = storage::build_profile_storage(&config)
            .await
            .expect("Failed to build profile storage");

        let state = AppState::new(repo, profiles, config.clone());
        let router = create_router(state);

        Self {
            router,
            config: Arc::new(config),
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Send a JSON body.
    pub async fn send_json(&self, method: Method, uri: &str, body: &Value) -> Response<Body> {
        let req = Self::request(method, uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.oneshot(req).await
    }

    /// Send a bodyless request.
    pub async fn send(&self, method: Method, uri: &str) -> Response<Body> {
        let req = Self::request(method, uri).body(Body::empty()).unwrap();
        self.oneshot(req).await
    }

    /// Create a user through the API and return its JSON record.
    pub async fn create_user(&self, first_name: &str, email: &str) -> Value {
        let resp = self
            .send_json(Method::POST, "/api/users", &user_json(first_name, email))
            .await;
        assert_eq!(resp.status(), 201, "create_user failed");
        body_to_json(resp).await["data"].clone()
    }
}

// ============================================================================
// Data helpers
// ============================================================================

/// A complete, valid create body.
pub fn user_json(first_name: &str, email: &str) -> Value {
    json!({
        "firstName": first_name,
        "lastName": "Sharma",
        "email": email,
        "mobile": "9876543210",
        "gender": "Male",
        "status": "Active",
        "location": "Bengaluru",
    })
}

/// Build a multipart body from text fields and an optional file part.
///
/// The file is `(field name, filename, content type, bytes)`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Build a multipart request.
pub fn multipart_request(method: Method, uri: &str, body: Vec<u8>) -> Request<Body> {
    TestApp::request(method, uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
