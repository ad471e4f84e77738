#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use printdesk_core::roles::RoleAllowList;
use printdesk_core::service::SolicitationService;
use printdesk_core::storage::FileArea;
use printdesk_core::store::memory::MemoryStore;
use tower::ServiceExt;

use printdesk_api::auth::jwt::{generate_access_token, JwtConfig};
use printdesk_api::config::ServerConfig;
use printdesk_api::router::build_app_router;
use printdesk_api::state::AppState;

pub const ADMIN: &str = "900";
pub const MANAGER: &str = "800";
pub const BOUNDARY: &str = "printdesk-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(files_base_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
        files_base_dir,
        roles: RoleAllowList::new(vec![ADMIN.to_string()], vec![MANAGER.to_string()]),
        retention_hours: 72,
        sweep_interval_secs: 3600,
        max_upload_bytes: 1024 * 1024,
    }
}

/// The full router over an in-memory store and a temporary file area.
pub struct TestApp {
    pub router: Router,
    pub config: ServerConfig,
    pub files: PathBuf,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Bearer token for `registration`, named and mailed after it.
    pub fn token(&self, registration: &str) -> String {
        generate_access_token(
            registration,
            &format!("User {registration}"),
            &format!("{registration}@example.edu"),
            &self.config.jwt,
        )
        .expect("token generation should succeed")
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("tempdir");
    let files = tmp.path().join("solicitations");
    let config = test_config(files.clone());

    let service = SolicitationService::new(
        Arc::new(MemoryStore::new()),
        FileArea::new(files.clone()),
    );
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        config,
        files,
        _tmp: tmp,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router should respond")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn request_auth(app: Router, method: Method, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Send a create/patch submission: the JSON draft plus `files` parts in order.
pub async fn submit(
    app: Router,
    method: Method,
    uri: &str,
    token: &str,
    draft: serde_json::Value,
    files: &[(&str, &[u8])],
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(&draft, files)))
        .unwrap();
    send(app, request).await
}

pub fn multipart_body(draft: &serde_json::Value, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"solicitation\"\r\n\
             Content-Type: application/json\r\n\r\n{draft}\r\n"
        )
        .as_bytes(),
    );
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// A draft with one single-copy, three-page entry per file name.
pub fn draft(files: &[&str]) -> serde_json::Value {
    let copies: Vec<_> = files
        .iter()
        .map(|name| {
            serde_json::json!({
                "file_name": name,
                "file_type": "application/pdf",
                "page_count": 3,
                "print_config": { "copies": 1 }
            })
        })
        .collect();
    serde_json::json!({ "deadline": 24, "copies": copies })
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
