//! Synthetic traffic endpoints.
//!
//! - `/api/success` : 200 after a random delay
//! - `/api/failure` : one of nine failure outcomes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tokio::time::{sleep, Duration};

use faultline_core::error::FaultlineError;
use faultline_core::{FailureGenerator, FailureOutcome};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::obs::{metrics::MetricsRegistry, SYNTHETIC_FAILURES_TOTAL};

#[derive(Debug, Serialize)]
pub struct SuccessBody {
    pub message: &'static str,
    pub latency: u64,
}

pub async fn success(State(state): State<AppState>) -> Result<Json<SuccessBody>, ApiError> {
    let latency = state.latency().next_delay();
    sleep(Duration::from_millis(latency)).await;
    Ok(Json(SuccessBody {
        message: "Success",
        latency,
    }))
}

pub async fn failure(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.failure().next_outcome();
    respond_with(state.failure(), state.metrics(), outcome).await
}

/// Answer a drawn outcome. The unhandled fault leaves through `?` and is
/// converted by `ApiError`'s `IntoResponse`.
pub async fn respond_with(
    generator: &FailureGenerator,
    metrics: &MetricsRegistry,
    outcome: FailureOutcome,
) -> Result<Response, ApiError> {
    if let Err(e) = metrics.increment(SYNTHETIC_FAILURES_TOTAL, &[("outcome", outcome.label())]) {
        tracing::warn!(error = %e, "failed to count synthetic failure");
    }

    let failure = generator.resolve(outcome).map_err(|fault| {
        tracing::error!(outcome = outcome.label(), error = %fault, "unhandled fault at failure endpoint");
        fault
    })?;

    if let Some(delay) = failure.delay {
        sleep(delay).await;
    }

    let status = StatusCode::from_u16(failure.status)
        .map_err(|e| FaultlineError::Internal(format!("bad synthetic status {}: {e}", failure.status)))?;
    tracing::debug!(outcome = outcome.label(), status = failure.status, "synthetic failure");

    Ok((status, Json(json!({ "error": failure.error }))).into_response())
}
