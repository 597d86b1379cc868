//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Response Codes
///
/// - **307 Temporary Redirect**: code is live, `Location` is the target
/// - **404 Not Found**: code is unknown, expired or evicted; the body is the
///   configured HTML page
pub async fn redirect_handler(Path(code): Path<String>, State(state): State<AppState>) -> Response {
    let Some(url) = state.url_service.retrieve_url(&code) else {
        debug!(code = %code, "Short code not found");
        return not_found(&state);
    };

    match HeaderValue::from_str(&url) {
        Ok(location) => (
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, location)],
        )
            .into_response(),
        Err(_) => {
            warn!(code = %code, "Stored URL is not a valid Location header");
            not_found(&state)
        }
    }
}

fn not_found(state: &AppState) -> Response {
    (StatusCode::NOT_FOUND, Html(state.not_found_page.to_string())).into_response()
}
