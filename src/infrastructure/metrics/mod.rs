//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Messages admitted / duplicate submissions rejected
//! - Open subscription streams and registry figures

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::application::realtime::RegistryStats;

const NAMESPACE: &str = "messaging_server";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new("http_request_duration_seconds", "HTTP request latency in seconds")
            .namespace(NAMESPACE)
            .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Messages admitted by the send gate and persisted
pub static MESSAGES_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("messages_sent_total", "Messages admitted and persisted").namespace(NAMESPACE),
    )
    .expect("Failed to create MESSAGES_SENT_TOTAL metric")
});

/// Submissions rejected as duplicates
pub static DUPLICATE_SUBMISSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "duplicate_submissions_total",
            "Message submissions rejected by the idempotency gate",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create DUPLICATE_SUBMISSIONS_TOTAL metric")
});

/// Open subscription streams
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("websocket_connections_active", "Number of open subscription streams")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Live subscriptions held by the registry
pub static REALTIME_SUBSCRIPTIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("realtime_subscriptions", "Live chat subscriptions").namespace(NAMESPACE),
    )
    .expect("Failed to create REALTIME_SUBSCRIPTIONS metric")
});

/// Chats with at least one subscriber
pub static REALTIME_CHATS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("realtime_chats", "Chats with at least one live subscriber").namespace(NAMESPACE),
    )
    .expect("Failed to create REALTIME_CHATS metric")
});

/// Subscribers evicted for saturated or abandoned queues
pub static REALTIME_EVICTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("realtime_evictions_total", "Subscribers evicted by the broadcast dispatcher")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create REALTIME_EVICTIONS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(MESSAGES_SENT_TOTAL.clone()))
        .expect("Failed to register MESSAGES_SENT_TOTAL");
    registry
        .register(Box::new(DUPLICATE_SUBMISSIONS_TOTAL.clone()))
        .expect("Failed to register DUPLICATE_SUBMISSIONS_TOTAL");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(REALTIME_SUBSCRIPTIONS.clone()))
        .expect("Failed to register REALTIME_SUBSCRIPTIONS");
    registry
        .register(Box::new(REALTIME_CHATS.clone()))
        .expect("Failed to register REALTIME_CHATS");
    registry
        .register(Box::new(REALTIME_EVICTIONS_TOTAL.clone()))
        .expect("Failed to register REALTIME_EVICTIONS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_message_sent() {
    MESSAGES_SENT_TOTAL.inc();
}

pub fn record_duplicate_submission() {
    DUPLICATE_SUBMISSIONS_TOTAL.inc();
}

pub fn record_realtime_eviction() {
    REALTIME_EVICTIONS_TOTAL.inc();
}

/// Mirror the registry's live figures into the realtime gauges.
pub fn update_realtime_stats(stats: &RegistryStats) {
    REALTIME_SUBSCRIPTIONS.set(stats.subscriptions as i64);
    REALTIME_CHATS.set(stats.chats as i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_namespace() {
        record_message_sent();
        record_http_request("GET", "/health", 200, 0.001);

        let output = gather_metrics();

        assert!(output.contains("messaging_server_messages_sent_total"));
        assert!(output.contains("messaging_server_http_requests_total"));
    }

    #[test]
    fn test_concurrent_scrapes_set_gauges() {
        let stats = RegistryStats {
            subscriptions: 4,
            chats: 2,
            evictions_total: 3,
            ..Default::default()
        };

        let scrapes: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(move || update_realtime_stats(&stats)))
            .collect();
        for scrape in scrapes {
            scrape.join().unwrap();
        }

        assert_eq!(REALTIME_SUBSCRIPTIONS.get(), 4);
        assert_eq!(REALTIME_CHATS.get(), 2);
    }
}
