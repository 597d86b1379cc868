//! Handler for link shortening endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::debug;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::url_validator::validate_url;

/// Creates a short code for a URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// Passes the global and per-client rate limiters first.
///
/// # Request Body
///
/// ```json
/// { "original": "https://example.com/some/long/path" }
/// ```
///
/// # Response
///
/// **201 Created**
///
/// ```json
/// { "shortCode": "aB3dE6gH9k" }
/// ```
///
/// # Errors
///
/// - 400 Bad Request if the body cannot be decoded or the URL is too long,
///   malformed, has no host or is not http(s)
/// - 500 Internal Server Error if no free short code could be found
pub async fn shorten_handler(
    State(state): State<AppState>,
    payload: Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    validate_url(&payload.original, state.config.url_store.max_url_length)?;

    let short_code = state.url_service.shorten_url(&payload.original)?;
    debug!(code = %short_code, "Short link created");

    Ok((StatusCode::CREATED, Json(ShortenResponse { short_code })))
}
