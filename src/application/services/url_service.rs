//! Short link creation, lookup and expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::config::UrlStoreConfig;
use crate::domain::entities::UrlMapping;
use crate::domain::repositories::{InsertOutcome, UrlRepository};
use crate::infrastructure::memory::MemoryUrlRepository;
use crate::infrastructure::worker::PeriodicWorker;
use crate::utils::code_generator::CodeGenerator;

/// Candidate codes tried before giving up on a shorten request.
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// Faults of [`UrlService::shorten_url`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortenError {
    /// Every candidate collided with a live code. The code length is too
    /// short for the store's occupancy.
    #[error("no free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },
}

/// Service for creating and resolving short links.
///
/// Entries expire `ttl` after creation. Lookups check expiry themselves, so
/// an expired link is never served even if the sweep has not reached it yet.
pub struct UrlService {
    repository: Arc<dyn UrlRepository>,
    generator: CodeGenerator,
    ttl: Duration,
    sweeper: PeriodicWorker,
}

impl UrlService {
    /// Creates a service over a bounded in-memory repository and starts its
    /// expiry sweep.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: &UrlStoreConfig) -> Self {
        Self::with_repository(
            Arc::new(MemoryUrlRepository::new(config.capacity)),
            config,
        )
    }

    /// Creates a service over an existing repository.
    ///
    /// Only the TTL, code length and sweep interval of `config` are used;
    /// capacity is the repository's concern.
    pub fn with_repository(repository: Arc<dyn UrlRepository>, config: &UrlStoreConfig) -> Self {
        let sweep_repository = repository.clone();
        let sweeper = PeriodicWorker::spawn(
            "url-expiry-sweep",
            config.sweep_interval,
            MissedTickBehavior::Skip,
            move || {
                let removed = sweep_repository.remove_expired(Instant::now());
                if removed > 0 {
                    debug!(removed, remaining = sweep_repository.len(), "Swept expired URLs");
                }
            },
        );

        info!(
            ttl_secs = config.ttl.as_secs(),
            code_length = config.code_length,
            "URL store online"
        );

        Self {
            repository,
            generator: CodeGenerator::new(config.code_length),
            ttl: config.ttl,
            sweeper,
        }
    }

    /// Stores `original` under a fresh short code and returns the code.
    ///
    /// `original` must already be validated. When the store is full the entry
    /// closest to expiry is evicted to make room.
    ///
    /// # Errors
    ///
    /// Returns [`ShortenError::CodeSpaceExhausted`] if [`MAX_CODE_ATTEMPTS`]
    /// candidates all collide with live codes.
    pub fn shorten_url(&self, original: &str) -> Result<String, ShortenError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = self.generator.generate();
            let mapping = UrlMapping::new(code.clone(), original.to_string(), self.ttl);

            match self.repository.insert(mapping) {
                InsertOutcome::Inserted { evicted } => {
                    if let Some(evicted) = evicted {
                        debug!(evicted = %evicted, "Store full, evicted oldest URL");
                    }
                    return Ok(code);
                }
                InsertOutcome::Collision => {
                    debug!(attempt, "Short code collision, retrying");
                }
            }
        }

        error!(
            attempts = MAX_CODE_ATTEMPTS,
            code_length = self.generator.length(),
            "Short code space exhausted"
        );
        Err(ShortenError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    /// Resolves a short code to its target URL.
    ///
    /// # Returns
    ///
    /// - `Some(url)` if the code exists and has not expired
    /// - `None` if absent, expired or evicted
    pub fn retrieve_url(&self, code: &str) -> Option<String> {
        self.repository
            .get(code, Instant::now())
            .map(|mapping| mapping.original_url)
    }

    /// Deletes a short link. Returns `true` if it existed.
    pub fn remove_url(&self, code: &str) -> bool {
        self.repository.remove(code)
    }

    /// Best-effort entry count, for metrics.
    pub fn len(&self) -> usize {
        self.repository.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the expiry sweep. Later calls do nothing.
    pub fn offline(&self) {
        if self.sweeper.stop() {
            info!("URL store offline");
        }
    }

    pub fn is_online(&self) -> bool {
        self.sweeper.is_running()
    }
}
