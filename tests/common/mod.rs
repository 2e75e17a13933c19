//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.
//!
//! The router runs against a lazily connected Postgres pool and the
//! in-memory idempotency store, so every request that is rejected before
//! touching storage can be exercised without external services.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use serde_json::Value;
use tower::ServiceExt;

use messaging_server::config::Settings;
use messaging_server::infrastructure::database;
use messaging_server::startup::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Settings for tests: memory idempotency backend, fast database timeouts.
pub fn test_settings() -> Settings {
    Settings::defaults("test")
        .and_then(|b| b.set_override("jwt.secret", TEST_JWT_SECRET))
        .and_then(|b| b.set_override("idempotency.backend", "memory"))
        .and_then(|b| b.set_override("database.acquire_timeout", 1))
        .and_then(|b| b.build())
        .and_then(|c| c.try_deserialize::<Settings>())
        .and_then(Settings::validate)
        .expect("test settings should be valid")
}

/// Test application builder
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a test application around the real router
    pub async fn new() -> Self {
        let settings = test_settings();
        let db = database::create_lazy_pool(&settings.database).expect("lazy pool");
        let state = AppState::new(settings, db, None).expect("app state");

        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    /// Issue a valid bearer token for a made-up user
    pub fn token_for(&self, user_id: i64) -> String {
        let username: String = Username().fake();
        let email: String = SafeEmail().fake();
        self.state
            .tokens
            .issue(user_id, &username, &email)
            .expect("token")
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.request("GET", uri, None, None).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.request("POST", uri, Some(body), None).await
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.request("GET", uri, None, Some(token)).await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(&self, uri: &str, body: Value, token: &str) -> Response {
        self.request("POST", uri, Some(body), Some(token)).await
    }

    /// Make an authenticated PATCH request with JSON body
    pub async fn patch_json_auth(&self, uri: &str, body: Value, token: &str) -> Response {
        self.request("PATCH", uri, Some(body), Some(token)).await
    }
}

/// Read a JSON response body
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Assert status and error code of an error response
pub async fn assert_error(response: Response, status: StatusCode, code: u64) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected body: {json}");
}

/// Generate a unique test email
pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4())
}
