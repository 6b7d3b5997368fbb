//! Request instrumentation.
//!
//! Installed with `Router::layer`, so it wraps every route and the not-found
//! fallback. Records exactly one counter increment and one histogram
//! observation per request, whatever the handler returned (or if it panicked).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use faultline_core::FaultlineError;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::obs::{metrics::MetricsRegistry, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    // Unmatched paths fall back to the raw path (unbounded cardinality).
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let metrics = Arc::clone(state.metrics());

    // Detached: a client disconnect neither cuts the handler short nor skips recording.
    let task = tokio::spawn(async move {
        let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(%method, %route, "handler panicked");
                ApiError::from(FaultlineError::Internal("handler panicked".into())).into_response()
            }
        };
        record_request(
            &metrics,
            method.as_str(),
            &route,
            response.status().as_str(),
            start.elapsed(),
        );
        response
    });

    task.await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "request task failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

/// Record a finished request. Registry errors are logged, never surfaced.
pub fn record_request(
    metrics: &MetricsRegistry,
    method: &str,
    route: &str,
    status_code: &str,
    elapsed: Duration,
) {
    let labels = [("method", method), ("route", route), ("status_code", status_code)];

    if let Err(e) = metrics.increment(HTTP_REQUESTS_TOTAL, &labels) {
        tracing::warn!(error = %e, "failed to count request");
    }
    if let Err(e) = metrics.observe(HTTP_REQUEST_DURATION_SECONDS, &labels, elapsed.as_secs_f64()) {
        tracing::warn!(error = %e, "failed to observe request duration");
    }

    tracing::info!(
        method,
        route,
        status = status_code,
        latency_ms = elapsed.as_millis() as u64,
        "request completed"
    );
}
