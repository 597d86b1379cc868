//! Validation of URLs submitted for shortening.

use url::{ParseError, Url};

/// Reasons a submitted URL is refused.
///
/// Display strings are returned to API callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Provided url exceeds max-length of {max}")]
    TooLong { max: usize },

    #[error("Invalid url provided")]
    InvalidFormat,

    #[error("Invalid url provided")]
    EmptyHost,

    #[error("Invalid protocol provided. Only http:// or https:// allowed")]
    UnsupportedProtocol,
}

/// Checks that `input` is an absolute HTTP(S) URL of at most `max_length` bytes.
///
/// # Rules
///
/// Checked in order, the first failure wins:
///
/// 1. Length: at most `max_length` bytes
/// 2. Format: parses as an absolute URL
/// 3. Host: non-empty
/// 4. Protocol: `http` or `https`
///
/// # Errors
///
/// Returns the [`UrlValidationError`] of the first rule violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_url("https://example.com/path?q=1", 2048).is_ok());
/// assert!(validate_url("ftp://example.com", 2048).is_err());
/// ```
pub fn validate_url(input: &str, max_length: usize) -> Result<(), UrlValidationError> {
    if input.len() > max_length {
        return Err(UrlValidationError::TooLong { max: max_length });
    }

    let url = Url::parse(input).map_err(|e| match e {
        ParseError::EmptyHost => UrlValidationError::EmptyHost,
        _ => UrlValidationError::InvalidFormat,
    })?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::EmptyHost);
    }

    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(UrlValidationError::UnsupportedProtocol),
    }
}
