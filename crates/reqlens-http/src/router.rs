//! Axum router wiring.
//!
//! Demo latency routes plus ops endpoints, all behind the timing middleware.

use axum::{middleware, routing::{any, get}, Router};

use crate::{app_state::AppState, demo, middleware::track_request, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/500ms", any(demo::half_second))
        .route("/1s", any(demo::one_second))
        .route("/2s", any(demo::two_seconds))
        .route("/dynamic_delay", any(demo::dynamic_delay))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route("/metrics/json", get(ops::metrics_json))
        .layer(middleware::from_fn_with_state(state.clone(), track_request))
        .with_state(state)
}
