//! Message API Tests
//!
//! Validation must reject a send before the idempotency gate records it.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::{assert_error, TestApp};

#[tokio::test]
async fn test_send_empty_content_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .post_json_auth("/api/v1/chats/7/messages", json!({ "content": "" }), &token)
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_send_oversized_content_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .post_json_auth(
            "/api/v1/chats/7/messages",
            json!({ "content": "x".repeat(4001) }),
            &token,
        )
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_send_oversized_idempotency_key_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .post_json_auth(
            "/api/v1/chats/7/messages",
            json!({ "content": "hi", "idempotency_key": "k".repeat(256) }),
            &token,
        )
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_send_to_malformed_chat_id_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .post_json_auth("/api/v1/chats/seven/messages", json!({ "content": "hi" }), &token)
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_unknown_status_is_rejected() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app
        .patch_json_auth(
            "/api/v1/messages/9/status",
            json!({ "status": "ARCHIVED" }),
            &token,
        )
        .await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}

#[tokio::test]
async fn test_status_update_requires_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            "PATCH",
            "/api/v1/messages/9/status",
            Some(json!({ "status": "READ" })),
            None,
        )
        .await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}
