//! Handler for the live metrics stream.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{Stream, StreamExt, pin_mut};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::api::dto::events::error_event;
use crate::application::services::METRICS_INTERVAL;
use crate::state::AppState;

/// Consecutive encoding failures tolerated before the stream gives up.
pub const MAX_CONSECUTIVE_ENCODE_FAILURES: usize = 2;

const METRICS_UNAVAILABLE: &str = "Metrics Streaming is currently unavailable.";

/// Streams limiter and store metrics once per second.
///
/// # Endpoint
///
/// `GET /api/metrics/stream`
///
/// # Events
///
/// ```text
/// data: {"globalTokenBucketCap":50000,"globalTokensUsed":18,"activeUsers":3,"currentUrlCount":42}
/// ```
///
/// The stream runs until the client disconnects. If snapshots repeatedly
/// fail to encode it ends with an `error` event.
pub async fn metrics_stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Metrics stream opened");
    let snapshots = state.metrics.stream(METRICS_INTERVAL);

    Sse::new(encode_with_tolerance(
        snapshots,
        MAX_CONSECUTIVE_ENCODE_FAILURES,
    ))
    .keep_alive(KeepAlive::default())
}

/// Encodes each item as an SSE `data` event.
///
/// Up to `tolerance` consecutive encoding failures are skipped; the next one
/// emits a terminal `error` event and ends the stream.
pub fn encode_with_tolerance<S, T>(
    items: S,
    tolerance: usize,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = T>,
    T: Serialize,
{
    stream! {
        pin_mut!(items);
        let mut failures = 0;

        while let Some(item) = items.next().await {
            match Event::default().json_data(&item) {
                Ok(event) => {
                    failures = 0;
                    yield Ok(event);
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "Failed to encode metrics event");
                    if failures > tolerance {
                        error!("Metrics stream terminated after repeated encoding failures");
                        yield Ok(error_event(METRICS_UNAVAILABLE));
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde::Serializer;

    /// Fails to serialize when `broken` is set.
    struct Sample {
        broken: bool,
    }

    impl Serialize for Sample {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.broken {
                Err(serde::ser::Error::custom("broken sample"))
            } else {
                serializer.serialize_u8(1)
            }
        }
    }

    fn samples(pattern: &[bool]) -> impl Stream<Item = Sample> {
        stream::iter(
            pattern
                .iter()
                .map(|&broken| Sample { broken })
                .collect::<Vec<_>>(),
        )
    }

    async fn count_events(pattern: &[bool]) -> usize {
        encode_with_tolerance(samples(pattern), MAX_CONSECUTIVE_ENCODE_FAILURES)
            .count()
            .await
    }

    #[tokio::test]
    async fn test_healthy_items_all_encoded() {
        assert_eq!(count_events(&[false, false, false]).await, 3);
    }

    #[tokio::test]
    async fn test_isolated_failures_are_skipped() {
        // Two failures in a row are tolerated and the count resets on success.
        let pattern = [false, true, true, false, true, true, false];
        assert_eq!(count_events(&pattern).await, 3);
    }

    #[tokio::test]
    async fn test_third_consecutive_failure_ends_stream() {
        let pattern = [false, true, true, true, false, false];
        // One data event, then the terminal error event; the rest is dropped.
        assert_eq!(count_events(&pattern).await, 2);
    }
}
