//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness probes.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (can the server accept traffic?)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::application::realtime::RegistryStats;
use crate::startup::AppState;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

/// Basic health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

/// Individual service health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: ServiceHealth,
    /// Absent when the in-memory idempotency backend is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<ServiceHealth>,
    pub realtime: RealtimeHealth,
}

/// Health status for individual services
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Subscription registry figures
#[derive(Debug, Serialize)]
pub struct RealtimeHealth {
    pub status: HealthStatus,
    pub chats: usize,
    pub subscriptions: usize,
    pub evictions_total: u64,
}

impl RealtimeHealth {
    fn from_stats(stats: RegistryStats, shut_down: bool) -> Self {
        Self {
            status: if shut_down {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Healthy
            },
            chats: stats.chats,
            subscriptions: stats.subscriptions,
            evictions_total: stats.evictions_total,
        }
    }
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe - checks if the server can accept traffic
/// Returns 200 if ready, 503 if dependencies are unavailable
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let started_at = SERVER_START_TIME.to_rfc3339();

    let db_health = check_database(&state).await;
    let redis_health = check_redis(&state).await;
    let realtime = RealtimeHealth::from_stats(state.registry.stats(), state.registry.is_shut_down());

    let overall_status = determine_overall_status(&db_health, redis_health.as_ref(), &realtime);

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
        started_at,
        checks: HealthChecks {
            database: db_health,
            redis: redis_health,
            realtime,
        },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Check database connectivity and latency
async fn check_database(state: &AppState) -> ServiceHealth {
    let start = Instant::now();
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => {
            let latency = start.elapsed().as_millis() as u64;
            ServiceHealth {
                status: if latency < 100 {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                message: None,
            }
        }
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Database connection failed: {}", e)),
        },
    }
}

/// Check Redis connectivity and latency
async fn check_redis(state: &AppState) -> Option<ServiceHealth> {
    let mut conn = state.redis.clone()?;
    let start = Instant::now();
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;

    Some(match pong {
        Ok(_) => {
            let latency = start.elapsed().as_millis() as u64;
            ServiceHealth {
                status: if latency < 50 {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(latency),
                message: None,
            }
        }
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Redis connection failed: {}", e)),
        },
    })
}

/// Determine overall health based on individual checks
///
/// The send gate fails closed without Redis, so an unhealthy Redis makes the
/// whole server unhealthy.
fn determine_overall_status(
    db: &ServiceHealth,
    redis: Option<&ServiceHealth>,
    realtime: &RealtimeHealth,
) -> HealthStatus {
    let redis_status = redis.map(|r| r.status).unwrap_or(HealthStatus::Healthy);

    if db.status == HealthStatus::Unhealthy
        || redis_status == HealthStatus::Unhealthy
        || realtime.status == HealthStatus::Unhealthy
    {
        return HealthStatus::Unhealthy;
    }

    if db.status == HealthStatus::Degraded || redis_status == HealthStatus::Degraded {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(status: HealthStatus) -> ServiceHealth {
        ServiceHealth {
            status,
            latency_ms: None,
            message: None,
        }
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, "\"healthy\"");
    }

    #[test]
    fn test_determine_overall_status() {
        let realtime = RealtimeHealth::from_stats(RegistryStats::default(), false);

        assert_eq!(
            determine_overall_status(&service(HealthStatus::Healthy), None, &realtime),
            HealthStatus::Healthy
        );
        assert_eq!(
            determine_overall_status(
                &service(HealthStatus::Degraded),
                Some(&service(HealthStatus::Healthy)),
                &realtime
            ),
            HealthStatus::Degraded
        );
        assert_eq!(
            determine_overall_status(
                &service(HealthStatus::Healthy),
                Some(&service(HealthStatus::Unhealthy)),
                &realtime
            ),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_shut_down_registry_is_unhealthy() {
        let realtime = RealtimeHealth::from_stats(RegistryStats::default(), true);
        assert_eq!(
            determine_overall_status(&service(HealthStatus::Healthy), None, &realtime),
            HealthStatus::Unhealthy
        );
    }
}
