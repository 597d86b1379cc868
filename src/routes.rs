//! Top-level router configuration combining API and front-end routes.
//!
//! # Route Structure
//!
//! - `GET  /`                        - Front-end entry page
//! - `GET  /{code}`                  - Short link redirect
//! - `GET  /health`                  - Limiter and store liveness
//! - `/api/*`                        - Shorten, metrics and stress test endpoints
//! - anything else                   - Static front-end assets, `.txt`
//!                                     files refused with 403
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **CORS** - Configured origin allow-list
//! - **Rate limiting** - Global token bucket on every route, per-client
//!   sliding window on `POST /api/shorten`
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler};
use crate::api::middleware::{cors, rate_limit, static_files, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::{ServeDir, ServeFile};

/// Router of an isolated stress test stack.
///
/// Serves the redirect, health, shorten and metrics endpoints behind the
/// global limiter. No front-end, CORS or stress test endpoint.
pub fn core_router(state: AppState) -> Router {
    service_routes(api::routes::api_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::global,
        ))
        .with_state(state)
}

/// Constructs the public application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let frontend_dir = state.config.frontend_dir.clone();
    let cors = cors::layer(&state.config.cors_allowed_origins);

    let api_router = api::routes::api_routes(state.clone()).merge(api::routes::stress_routes());

    let router = service_routes(api_router)
        .route_service("/", ServeFile::new(frontend_dir.join("index.html")))
        .fallback_service(
            middleware::from_fn(static_files::hide_text_files).layer(ServeDir::new(frontend_dir)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::global,
        ))
        .with_state(state)
        .layer(cors)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

fn service_routes(api_router: Router<AppState>) -> Router<AppState> {
    Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api", api_router)
}
