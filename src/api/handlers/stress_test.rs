//! Handler for the stress test stream.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt};

use crate::api::dto::events::{done_event, error_event, output_event};
use crate::application::stress::{StressEvent, run_stress_test};
use crate::state::AppState;

const TESTS_COMPLETED: &str = "Tests completed successfully.";

/// Runs a stress test against an isolated copy of the service and streams
/// the load generator's output.
///
/// # Endpoint
///
/// `GET /api/stress-test/stream`
///
/// # Events
///
/// ```text
/// data: {"outputLine":"[  500/5000] ok=497 limited=3 failed=0"}
///
/// event: done
/// data: {"outputLine":"Tests completed successfully."}
/// ```
///
/// A failed run ends with `event: error` and `{"errorMessage": ...}`.
/// Disconnecting kills the load generator and tears the isolated stack down.
pub async fn stress_test_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = run_stress_test(state.config.clone()).map(|event| {
        Ok(match event {
            StressEvent::Output(line) => output_event(line),
            StressEvent::Done => done_event(TESTS_COMPLETED),
            StressEvent::Failed(e) => error_event(e.user_message()),
        })
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
