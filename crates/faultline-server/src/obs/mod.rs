//! Observability: metrics registry, request instrumentation, process
//! collector and log setup.
//!
//! Metrics are stored as atomics and rendered by the `/metrics` handler.

pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod process;

use faultline_core::error::Result;

use metrics::MetricsRegistry;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const SYNTHETIC_FAILURES_TOTAL: &str = "synthetic_failures_total";

/// Request metric labels.
pub const REQUEST_LABELS: [&str; 3] = ["method", "route", "status_code"];

// Request duration buckets in seconds; +Inf is implicit.
pub const REQUEST_BUCKETS: [f64; 7] = [0.05, 0.1, 0.3, 0.5, 1.0, 2.0, 5.0];

/// Register the request and failure-path families.
pub fn register_http_metrics(registry: &MetricsRegistry) -> Result<()> {
    registry.register_counter(
        HTTP_REQUESTS_TOTAL,
        "Total number of HTTP requests",
        &REQUEST_LABELS,
    )?;
    registry.register_histogram(
        HTTP_REQUEST_DURATION_SECONDS,
        "Duration of HTTP requests in seconds",
        &REQUEST_LABELS,
        &REQUEST_BUCKETS,
    )?;
    registry.register_counter(
        SYNTHETIC_FAILURES_TOTAL,
        "Synthetic failure outcomes drawn by /api/failure",
        &["outcome"],
    )?;
    Ok(())
}
