//! URL mapping entity: a short code bound to its target URL.

use std::time::{Duration, Instant};

/// Expiry used when `created_at + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// A live short code → target URL binding.
///
/// Expiry is tracked on the monotonic clock so wall-clock adjustments never
/// resurrect or prematurely kill an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMapping {
    pub short_code: String,
    pub original_url: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl UrlMapping {
    /// Creates a mapping that starts now and lives for `ttl`.
    pub fn new(short_code: String, original_url: String, ttl: Duration) -> Self {
        Self::created_at(short_code, original_url, Instant::now(), ttl)
    }

    /// Creates a mapping with an explicit creation instant.
    ///
    /// A `ttl` too large for the clock is capped at roughly 30 years.
    pub fn created_at(
        short_code: String,
        original_url: String,
        created_at: Instant,
        ttl: Duration,
    ) -> Self {
        Self {
            short_code,
            original_url,
            created_at,
            expires_at: created_at
                .checked_add(ttl)
                .or_else(|| created_at.checked_add(FAR_FUTURE))
                .unwrap_or(created_at),
        }
    }

    /// Returns true once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
