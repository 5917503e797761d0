//! Prometheus metrics for application observability.
//!
//! Metrics are exposed through the exporter's own HTTP listener when
//! `METRICS_PORT` is non-zero. Recording functions are safe to call when no
//! exporter is installed; the `metrics` facade drops the samples.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `product_reviews_requests_rate_limited_total` - Requests rejected with 429
//! - `product_reviews_limiter_evictions_total` - Client entries removed by the sweep
//!
//! ## Histograms
//! - `product_reviews_store_query_duration_seconds` - Storage call duration
//!   (labels: resource, operation, status)
//!
//! ## Gauges
//! - `product_reviews_limiter_tracked_clients` - Clients currently held by the registry

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_RATE_LIMITED_TOTAL: &str = "product_reviews_requests_rate_limited_total";
    pub const LIMITER_EVICTIONS_TOTAL: &str = "product_reviews_limiter_evictions_total";
    pub const STORE_QUERY_DURATION_SECONDS: &str = "product_reviews_store_query_duration_seconds";
    pub const LIMITER_TRACKED_CLIENTS: &str = "product_reviews_limiter_tracked_clients";
}

/// Install the Prometheus exporter and describe every metric.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_RATE_LIMITED_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(
        names::LIMITER_EVICTIONS_TOTAL,
        "Total number of idle client entries evicted from the rate limiter"
    );
    describe_histogram!(
        names::STORE_QUERY_DURATION_SECONDS,
        "Storage query duration in seconds"
    );
    describe_gauge!(
        names::LIMITER_TRACKED_CLIENTS,
        "Number of clients currently tracked by the rate limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

pub fn record_rate_limited() {
    counter!(names::REQUESTS_RATE_LIMITED_TOTAL).increment(1);
}

pub fn record_evictions(count: usize) {
    counter!(names::LIMITER_EVICTIONS_TOTAL).increment(count as u64);
}

/// Record how long a storage call took.
pub fn record_store_query(resource: &'static str, operation: &'static str, ok: bool, duration_secs: f64) {
    let status = if ok { "ok" } else { "error" };
    histogram!(
        names::STORE_QUERY_DURATION_SECONDS,
        "resource" => resource,
        "operation" => operation,
        "status" => status
    )
    .record(duration_secs);
}

pub fn set_tracked_clients(count: usize) {
    gauge!(names::LIMITER_TRACKED_CLIENTS).set(count as f64);
}
