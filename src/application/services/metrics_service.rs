//! Periodic sampling of limiter and store state.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};

use crate::application::limiter::{GlobalRateLimiter, PerClientRateLimiter};
use crate::application::services::UrlService;

/// Period of the live metrics stream.
pub const METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Point-in-time view of the stateful components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub global_token_bucket_cap: u64,
    pub global_tokens_used: u64,
    pub active_users: usize,
    pub current_url_count: usize,
}

/// Read-only handle over the components a snapshot is taken from.
#[derive(Clone)]
pub struct MetricsService {
    global_limiter: Arc<GlobalRateLimiter>,
    client_limiter: Arc<PerClientRateLimiter>,
    url_service: Arc<UrlService>,
}

impl MetricsService {
    pub fn new(
        global_limiter: Arc<GlobalRateLimiter>,
        client_limiter: Arc<PerClientRateLimiter>,
        url_service: Arc<UrlService>,
    ) -> Self {
        Self {
            global_limiter,
            client_limiter,
            url_service,
        }
    }

    /// Samples every component once.
    ///
    /// Each value is read independently, so a snapshot taken under load is
    /// not a consistent cut across components.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            global_token_bucket_cap: self.global_limiter.capacity(),
            global_tokens_used: self.global_limiter.tokens_used(),
            active_users: self.client_limiter.active_clients(),
            current_url_count: self.url_service.len(),
        }
    }

    /// Yields a snapshot every `interval`, starting one interval from now.
    ///
    /// The stream never ends on its own; dropping it stops sampling.
    pub fn stream(&self, interval: Duration) -> impl Stream<Item = MetricsSnapshot> + use<> {
        let service = self.clone();

        stream! {
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                yield service.snapshot();
            }
        }
    }
}
