//! Handler-level tests on a paused clock.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use axum::{body::to_bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::Value;
use tokio::time::Instant;

use faultline_core::{FailureGenerator, FailureOutcome};
use faultline_server::{
    api,
    app_state::AppState,
    config::FaultlineConfig,
    obs::{self, metrics::MetricsRegistry, SYNTHETIC_FAILURES_TOTAL},
};

fn registry() -> MetricsRegistry {
    let r = MetricsRegistry::new();
    obs::register_http_metrics(&r).unwrap();
    r
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test(start_paused = true)]
async fn success_sleeps_for_reported_latency() {
    let state = AppState::new(FaultlineConfig::default()).unwrap();
    for _ in 0..20 {
        let start = Instant::now();
        let body = api::success(State(state.clone())).await.unwrap().0;
        assert_eq!(body.message, "Success");
        assert!((100..=2099).contains(&body.latency), "latency {}", body.latency);
        assert!(start.elapsed() >= Duration::from_millis(body.latency));
    }
}

#[tokio::test(start_paused = true)]
async fn every_outcome_maps_to_its_table_row() {
    let gen = FailureGenerator::default();
    let r = registry();
    let expected = [
        (FailureOutcome::BadRequest, 400, "Bad Request"),
        (FailureOutcome::Unauthorized, 401, "Unauthorized"),
        (FailureOutcome::Forbidden, 403, "Forbidden"),
        (FailureOutcome::NotFound, 404, "Resource Not Found"),
        (FailureOutcome::InternalServerError, 500, "Internal Server Error"),
        (FailureOutcome::BadGateway, 502, "Bad Gateway"),
        (FailureOutcome::ServiceUnavailable, 503, "Service Unavailable"),
        (FailureOutcome::GatewayTimeout, 504, "Gateway Timeout"),
        (FailureOutcome::UnhandledException, 500, "Unhandled Exception"),
    ];

    for (outcome, status, error) in expected {
        let resp = api::respond_with(&gen, &r, outcome).await.into_response();
        assert_eq!(resp.status().as_u16(), status, "{outcome:?}");
        assert_eq!(json_body(resp).await["error"], error, "{outcome:?}");
        assert_eq!(
            r.counter_value(SYNTHETIC_FAILURES_TOTAL, &[("outcome", outcome.label())]),
            Some(1)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn gateway_timeout_waits_before_answering() {
    let gen = FailureGenerator::new(Duration::from_millis(3000));
    let r = registry();

    let start = Instant::now();
    let resp = api::respond_with(&gen, &r, FailureOutcome::GatewayTimeout).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(3000));
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test(start_paused = true)]
async fn plain_failures_answer_immediately() {
    let gen = FailureGenerator::default();
    let r = registry();

    let start = Instant::now();
    api::respond_with(&gen, &r, FailureOutcome::BadGateway).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test]
async fn unhandled_fault_reaches_the_handler_boundary() {
    let gen = FailureGenerator::default();
    let r = registry();

    let err = api::respond_with(&gen, &r, FailureOutcome::UnhandledException)
        .await
        .expect_err("index 8 must propagate");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await, serde_json::json!({ "error": "Unhandled Exception" }));
}
