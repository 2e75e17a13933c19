//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::State,
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth_middleware;
use crate::presentation::websocket;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    metrics::update_realtime_stats(&state.registry.stats());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics::gather_metrics(),
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .merge(protected_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh_token))
}

/// User, chat, message and subscription routes (require a bearer token)
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/{user_id}", get(handlers::user::get_user))
        .route(
            "/chats",
            post(handlers::chat::create_chat).get(handlers::chat::list_chats),
        )
        .route("/chats/{chat_id}", get(handlers::chat::get_chat))
        .route(
            "/chats/{chat_id}/messages",
            post(handlers::message::send_message).get(handlers::message::list_messages),
        )
        .route("/chats/{chat_id}/subscribe", get(websocket::subscribe_handler))
        .route(
            "/messages/{message_id}/status",
            patch(handlers::message::update_status),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
