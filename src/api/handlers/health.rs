//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: All background workers running
/// - **503 Service Unavailable**: A worker has stopped (e.g. during shutdown)
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "global_limiter": { "status": "ok", "message": "49982/50000 tokens available" },
///     "client_limiter": { "status": "ok", "message": "12 active clients" },
///     "url_store": { "status": "ok", "message": "310 short links" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let global = &state.global_limiter;
    let global_check = check(
        global.is_online(),
        format!("{}/{} tokens available", global.available(), global.capacity()),
    );

    let client_check = check(
        state.client_limiter.is_online(),
        format!("{} active clients", state.client_limiter.active_clients()),
    );

    let store_check = check(
        state.url_service.is_online(),
        format!("{} short links", state.url_service.len()),
    );

    let all_healthy = [&global_check, &client_check, &store_check]
        .iter()
        .all(|check| check.status == "ok");

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            global_limiter: global_check,
            client_limiter: client_check,
            url_store: store_check,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

fn check(online: bool, detail: String) -> CheckStatus {
    if online {
        CheckStatus {
            status: "ok".to_string(),
            message: Some(detail),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some("Background worker stopped".to_string()),
        }
    }
}
