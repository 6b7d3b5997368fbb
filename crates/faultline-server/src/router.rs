//! Axum router wiring.

use axum::{middleware, routing::get, Router};

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/success", get(api::success))
        .route("/api/failure", get(api::failure))
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        // `layer` (not `route_layer`) so unmatched paths are counted too.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            obs::middleware::track_requests,
        ))
        .with_state(state)
}
