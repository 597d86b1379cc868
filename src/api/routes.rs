//! API route configuration.
//!
//! Everything here is nested under `/api`.

use crate::api::handlers::{metrics_stream_handler, shorten_handler, stress_test_handler};
use crate::api::middleware::rate_limit;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Routes shared by the public server and isolated test stacks.
///
/// # Endpoints
///
/// - `POST /shorten`         - Create a short code (per-client rate limited)
/// - `GET  /metrics/stream`  - Live limiter and store metrics (SSE)
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/shorten",
            post(shorten_handler).route_layer(middleware::from_fn_with_state(
                state,
                rate_limit::per_client,
            )),
        )
        .route("/metrics/stream", get(metrics_stream_handler))
}

/// Routes served only by the public server.
///
/// Kept apart so that a stack under stress cannot start a stress test of
/// its own.
///
/// # Endpoints
///
/// - `GET /stress-test/stream` - Run a stress test and stream its output (SSE)
pub fn stress_routes() -> Router<AppState> {
    Router::new().route("/stress-test/stream", get(stress_test_handler))
}
