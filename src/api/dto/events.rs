//! Payloads of server-sent events.

use axum::response::sse::Event;
use serde::Serialize;

use crate::error::ErrorResponse;

/// Event name of the final event of a successful stress run.
pub const DONE_EVENT: &str = "done";

/// Event name of terminal failure events.
pub const ERROR_EVENT: &str = "error";

/// One line of stress test output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputLine {
    pub output_line: String,
}

impl OutputLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            output_line: line.into(),
        }
    }
}

/// Builds `event: error` with an `{"errorMessage": ...}` payload.
pub fn error_event(message: &str) -> Event {
    Event::default()
        .event(ERROR_EVENT)
        .data(serialize_or_empty(&ErrorResponse::new(message)))
}

/// Builds an unnamed event carrying `{"outputLine": ...}`.
pub fn output_event(line: impl Into<String>) -> Event {
    Event::default().data(serialize_or_empty(&OutputLine::new(line)))
}

/// Builds `event: done` with a final output line.
pub fn done_event(line: &str) -> Event {
    Event::default()
        .event(DONE_EVENT)
        .data(serialize_or_empty(&OutputLine::new(line)))
}

// Plain string fields always serialize.
fn serialize_or_empty<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_default()
}
