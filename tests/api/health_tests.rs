//! Health and metrics endpoint tests

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;
    let server = TestServer::new(app.router).unwrap();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new().await;
    let server = TestServer::new(app.router).unwrap();

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "alive");
}

#[tokio::test]
async fn test_metrics_exposes_realtime_figures() {
    let app = TestApp::new().await;
    let _handle = app.state.registry.subscribe(1, 10).unwrap();
    let server = TestServer::new(app.router).unwrap();

    let response = server.get("/metrics").await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("messaging_server_realtime_subscriptions"));
    assert!(text.contains("messaging_server_realtime_evictions_total"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
