//! User API Tests

use axum::http::StatusCode;

use crate::common::{assert_error, TestApp};

#[tokio::test]
async fn test_get_user_requires_token() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/users/1").await;

    assert_error(response, StatusCode::UNAUTHORIZED, 10003).await;
}

#[tokio::test]
async fn test_get_user_rejects_malformed_id() {
    let app = TestApp::new().await;
    let token = app.token_for(1);

    let response = app.get_auth("/api/v1/users/not-a-snowflake", &token).await;

    assert_error(response, StatusCode::BAD_REQUEST, 10007).await;
}
