//! Guards in front of the static front-end.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Refuses any path with a segment ending in `.txt`.
///
/// Static exports keep prerender payloads as `.txt` files next to the pages.
/// Matching runs on the percent-decoded path, the same one the file server
/// resolves.
pub async fn hide_text_files(req: Request, next: Next) -> Response {
    if has_text_segment(req.uri().path()) {
        debug!(path = %req.uri().path(), "Refused hidden static file");
        return (StatusCode::FORBIDDEN, "403 Forbidden").into_response();
    }

    next.run(req).await
}

fn has_text_segment(path: &str) -> bool {
    let decoded = urlencoding::decode_binary(path.as_bytes());
    String::from_utf8_lossy(&decoded)
        .split('/')
        .any(|segment| segment.ends_with(".txt"))
}
