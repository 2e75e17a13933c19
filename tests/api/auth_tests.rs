//! Authentication API Tests
//!
//! Only paths that are decided before any database access.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{assert_error, unique_email, TestApp};

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new().await;
    let body = json!({
        "email": "not-an-email",
        "username": "testuser",
        "password": "ValidPassword123!"
    });

    let response = app.post_json("/api/v1/auth/register", body).await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new().await;
    let body = json!({
        "email": unique_email(),
        "username": "testuser",
        "password": "short"
    });

    let response = app.post_json("/api/v1/auth/register", body).await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_login_with_invalid_email_fails() {
    let app = TestApp::new().await;
    let body = json!({ "email": "nope", "password": "ValidPassword123!" });

    let response = app.post_json("/api/v1/auth/login", body).await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_refresh_with_garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/v1/auth/refresh", json!({ "token": "not.a.jwt" }))
        .await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}

#[tokio::test]
async fn test_refresh_of_fresh_token_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(42);

    let response = app
        .post_json("/api/v1/auth/refresh", json!({ "token": token }))
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10002).await;
}
