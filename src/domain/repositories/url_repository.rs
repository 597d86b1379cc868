//! Repository trait for short code → URL mappings.

use std::time::Instant;

use crate::domain::entities::UrlMapping;

/// Result of an insertion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The mapping was stored. `evicted` names the entry dropped to make room.
    Inserted { evicted: Option<String> },
    /// A live mapping already owns this short code; nothing was changed.
    Collision,
}

/// Repository interface for URL mappings.
///
/// Expiry is part of the contract: an expired mapping is never returned by
/// [`UrlRepository::get`] and never blocks an insert, whether or not a sweep
/// has run.
///
/// # Implementations
///
/// - [`crate::infrastructure::memory::MemoryUrlRepository`] - Bounded in-memory map
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
pub trait UrlRepository: Send + Sync {
    /// Looks up a live mapping by short code.
    ///
    /// # Returns
    ///
    /// - `Some(mapping)` if present and not expired at `now`
    /// - `None` if absent or expired
    fn get(&self, code: &str, now: Instant) -> Option<UrlMapping>;

    /// Stores a mapping, evicting the soonest-expiring entry when full.
    ///
    /// The mapping's `created_at` is treated as the current instant.
    fn insert(&self, mapping: UrlMapping) -> InsertOutcome;

    /// Removes a mapping. Returns `true` if one was present.
    fn remove(&self, code: &str) -> bool;

    /// Drops every mapping expired at `now` and returns how many were removed.
    fn remove_expired(&self, now: Instant) -> usize;

    /// Number of stored mappings, possibly including not-yet-swept expired ones.
    fn len(&self) -> usize;
}
