//! Lock-free in-memory token bucket.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::errors::LimiterError;
use crate::domain::repositories::TokenStore;

/// Token counter backed by a single atomic.
///
/// `debit` and `add_tokens` are compare-and-swap loops, so concurrent request
/// handlers and the refill worker never block each other and the counter can
/// neither underflow nor exceed capacity.
#[derive(Debug)]
pub struct MemoryBucket {
    count: AtomicU64,
    capacity: u64,
}

impl MemoryBucket {
    /// Creates a bucket holding `count` of `capacity` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] if `capacity` is zero or
    /// `count` exceeds `capacity`.
    pub fn new(count: u64, capacity: u64) -> Result<Self, LimiterError> {
        if capacity == 0 {
            return Err(LimiterError::invalid(
                "capacity must be a non-zero positive integer",
            ));
        }

        if count > capacity {
            return Err(LimiterError::invalid(format!(
                "initial count ({count}) must be less than or equal to capacity ({capacity})"
            )));
        }

        Ok(Self {
            count: AtomicU64::new(count),
            capacity,
        })
    }
}

impl TokenStore for MemoryBucket {
    fn debit(&self, count: u64) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(count)
            })
            .is_ok()
    }

    fn add_tokens(&self, count: u64) {
        let capacity = self.capacity;
        // Never fails: the closure always returns Some.
        let _ = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(count).min(capacity))
            });
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }
}
