//! DTOs for link shortening endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to shorten a single URL.
///
/// A missing `original` decodes as empty and is refused by validation, not
/// by the JSON extractor.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The URL to shorten (checked further by the URL validator).
    #[serde(default)]
    #[validate(length(min = 1, message = "Invalid url provided"))]
    pub original: String,
}

/// Created short code.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_code: String,
}
