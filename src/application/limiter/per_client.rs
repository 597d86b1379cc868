//! Sliding-window limiter keyed by client identity.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClientLimiterConfig;
use crate::domain::errors::LimiterError;
use crate::infrastructure::memory::ClientWindowStore;
use crate::infrastructure::worker::PeriodicWorker;

/// Admits at most `max_requests` per client within any trailing `window`.
///
/// Decisions for one client are serialised by that client's window lock;
/// distinct clients are decided in parallel. A sweep worker forgets clients
/// that stayed idle for longer than the configured TTL.
pub struct PerClientRateLimiter {
    store: Arc<ClientWindowStore>,
    window: Duration,
    max_requests: usize,
    sweeper: PeriodicWorker,
}

impl PerClientRateLimiter {
    /// Builds the limiter and starts its idle sweep.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] if the client capacity, request
    /// limit, window, idle TTL or sweep interval is zero.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: &ClientLimiterConfig) -> Result<Self, LimiterError> {
        if config.capacity == 0 {
            return Err(LimiterError::invalid("client capacity must be positive"));
        }
        if config.max_requests == 0 {
            return Err(LimiterError::invalid("request limit must be positive"));
        }
        if config.window.is_zero() {
            return Err(LimiterError::invalid("window must be positive"));
        }
        if config.idle_ttl.is_zero() || config.sweep_interval.is_zero() {
            return Err(LimiterError::invalid(
                "idle TTL and sweep interval must be positive",
            ));
        }

        let store = Arc::new(ClientWindowStore::new(config.capacity));

        let sweep_store = store.clone();
        let idle_ttl = config.idle_ttl;
        let sweeper = PeriodicWorker::spawn(
            "client-idle-sweep",
            config.sweep_interval,
            MissedTickBehavior::Skip,
            move || {
                let removed = sweep_store.remove_idle(idle_ttl);
                if removed > 0 {
                    debug!(removed, remaining = sweep_store.len(), "Swept idle clients");
                }
            },
        );

        info!(
            max_requests = config.max_requests,
            window_ms = config.window.as_millis() as u64,
            capacity = config.capacity,
            "Per-client rate limiter online"
        );

        Ok(Self {
            store,
            window: config.window,
            max_requests: config.max_requests,
            sweeper,
        })
    }

    /// Admits and records one request from `client` if its window has room.
    ///
    /// A new client that cannot be tracked because no room could be freed is
    /// rejected.
    pub fn allow(&self, client: &str) -> bool {
        let window = self.window;
        let limit = self.max_requests;

        let admitted = self.store.with_window(client, |log, now| {
            log.prune(now, window);
            if log.len() < limit {
                log.record(now);
                true
            } else {
                false
            }
        });

        admitted.unwrap_or_else(|| {
            warn!(client, "Client table full, rejecting new client");
            false
        })
    }

    /// Number of clients currently tracked.
    pub fn active_clients(&self) -> usize {
        self.store.len()
    }

    /// Stops the idle sweep. Later calls do nothing.
    pub fn offline(&self) {
        if self.sweeper.stop() {
            info!("Per-client rate limiter offline");
        }
    }

    pub fn is_online(&self) -> bool {
        self.sweeper.is_running()
    }
}
