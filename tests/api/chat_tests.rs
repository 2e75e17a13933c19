//! Chat API Tests

use axum::http::StatusCode;
use serde_json::json;
use test_case::test_case;

use crate::common::{assert_error, TestApp};

#[test_case("GET", "/api/v1/chats" ; "list chats")]
#[test_case("GET", "/api/v1/chats/1" ; "get chat")]
#[test_case("GET", "/api/v1/chats/1/messages" ; "list messages")]
#[test_case("GET", "/api/v1/chats/1/subscribe" ; "subscribe")]
#[tokio::test]
async fn test_protected_routes_require_token(method: &str, uri: &str) {
    let app = TestApp::new().await;

    let response = app.request(method, uri, None, None).await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/v1/chats", "definitely-not-a-jwt").await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = TestApp::new().await;
    let mut other = crate::common::test_settings();
    other.jwt.secret = "another-secret-that-is-long-enough-0123".into();
    let foreign = messaging_server::application::services::TokenIssuer::new(&other.jwt)
        .issue(1, "mallory", "mallory@example.com")
        .unwrap();

    let response = app.get_auth("/api/v1/chats", &foreign).await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}

#[tokio::test]
async fn test_create_chat_validates_email() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .post_json_auth(
            "/api/v1/chats",
            json!({ "name": "Lunch", "email": "not-an-email" }),
            &token,
        )
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_get_chat_rejects_malformed_id() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app.get_auth("/api/v1/chats/abc", &token).await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}
