//! API error type and its JSON rendering.
//!
//! Every failing API response carries the same body:
//!
//! ```json
//! { "errorMessage": "Invalid url provided" }
//! ```

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};
use validator::ValidationErrors;

use crate::application::services::ShortenError;
use crate::utils::url_validator::UrlValidationError;

/// Shown when the request body cannot be decoded.
pub const UNPROCESSABLE_REQUEST_MESSAGE: &str =
    "Oops, we couldn't process your request. Please try again later.";

/// Shown for every internal failure; details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something broke on our end. Please try again later.";

/// JSON body of failed API responses and SSE error events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Caller's fault; the message is shown to them as-is.
    #[error("{0}")]
    Validation(String),

    /// Server's fault; the message is logged, not returned.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(message) => {
                debug!(reason = %message, "Rejected invalid request");
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::Internal(message) => {
                error!(reason = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<UrlValidationError> for AppError {
    fn from(e: UrlValidationError) -> Self {
        AppError::bad_request(e.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(e: ValidationErrors) -> Self {
        debug!(errors = %e, "Payload validation failed");

        let message = e
            .field_errors()
            .values()
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| UNPROCESSABLE_REQUEST_MESSAGE.to_string());

        AppError::bad_request(message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        debug!(error = %e.body_text(), "Undecodable request body");
        AppError::bad_request(UNPROCESSABLE_REQUEST_MESSAGE)
    }
}

impl From<ShortenError> for AppError {
    fn from(e: ShortenError) -> Self {
        AppError::internal(e.to_string())
    }
}
