//! Storage trait for token bucket state.

/// A fixed-capacity token counter.
///
/// Implementations must keep `0 <= count() <= capacity()` under concurrent
/// `debit` and `add_tokens` calls.
///
/// # Implementations
///
/// - [`crate::infrastructure::memory::MemoryBucket`] - In-process atomic counter
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Removes `count` tokens if that many are available.
    ///
    /// Returns `false` without touching the counter otherwise.
    fn debit(&self, count: u64) -> bool;

    /// Adds `count` tokens, saturating at capacity.
    fn add_tokens(&self, count: u64);

    /// Current number of tokens.
    fn count(&self) -> u64;

    /// Maximum number of tokens.
    fn capacity(&self) -> u64;
}
