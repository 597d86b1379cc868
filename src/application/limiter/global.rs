//! Process-wide token bucket admission gate.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::config::GlobalLimiterConfig;
use crate::domain::errors::LimiterError;
use crate::domain::repositories::TokenStore;
use crate::infrastructure::memory::MemoryBucket;
use crate::infrastructure::worker::PeriodicWorker;

/// Shortest refill period. Faster rates spread several tokens over each tick.
const MIN_REFILL_PERIOD: Duration = Duration::from_millis(1);

/// Single admission gate shared by every request.
///
/// Owns a [`TokenStore`] and a refill worker that adds tokens at the
/// configured rate until [`GlobalRateLimiter::offline`] is called.
pub struct GlobalRateLimiter {
    bucket: Arc<dyn TokenStore>,
    refill: PeriodicWorker,
}

impl GlobalRateLimiter {
    /// Builds an in-memory limiter and starts its refill worker.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] if the capacity or rate is
    /// zero, or the initial count exceeds the capacity.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: &GlobalLimiterConfig) -> Result<Self, LimiterError> {
        let bucket = MemoryBucket::new(config.initial, config.capacity)?;
        Self::with_store(Arc::new(bucket), config.rate)
    }

    /// Builds a limiter over an existing token store refilled at `rate`
    /// tokens per second.
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::InvalidConfig`] if `rate` is zero.
    pub fn with_store(bucket: Arc<dyn TokenStore>, rate: u64) -> Result<Self, LimiterError> {
        if rate == 0 {
            return Err(LimiterError::invalid(
                "refill rate must be a non-zero positive integer",
            ));
        }

        let schedule = RefillSchedule::new(rate);
        let store = bucket.clone();
        let mut tick = 0;
        // Burst catches up on ticks lost to scheduling delays so the average
        // rate holds.
        let refill = PeriodicWorker::spawn(
            "token-refill",
            schedule.period,
            MissedTickBehavior::Burst,
            move || {
                tick = tick % schedule.ticks_per_second + 1;
                store.add_tokens(schedule.tokens_on_tick(tick));
            },
        );

        info!(
            capacity = bucket.capacity(),
            available = bucket.count(),
            rate,
            "Global rate limiter online"
        );

        Ok(Self { bucket, refill })
    }

    /// Debits `cost` tokens if available.
    ///
    /// A rejection leaves the bucket untouched.
    pub fn allow(&self, cost: u64) -> bool {
        self.bucket.debit(cost)
    }

    pub fn capacity(&self) -> u64 {
        self.bucket.capacity()
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> u64 {
        self.bucket.count()
    }

    /// `capacity - available`, as reported by the metrics stream.
    pub fn tokens_used(&self) -> u64 {
        self.capacity().saturating_sub(self.available())
    }

    /// Stops the refill worker. Later calls do nothing.
    pub fn offline(&self) {
        if self.refill.stop() {
            info!("Global rate limiter offline");
        }
    }

    pub fn is_online(&self) -> bool {
        self.refill.is_running()
    }
}

/// Tick period and per-tick increments for a per-second refill rate.
///
/// Up to 1000 tokens/s the bucket gains one token every `1/rate` seconds.
/// Above that, ticks are 1 ms apart and the rate is spread over the 1000
/// ticks of each second, so every whole second adds exactly `rate` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillSchedule {
    pub period: Duration,
    pub ticks_per_second: u64,
    rate: u64,
}

impl RefillSchedule {
    pub fn new(rate: u64) -> Self {
        let rate = rate.max(1);
        let per_second = Duration::from_secs(1);
        let max_ticks = u64::try_from(per_second.as_nanos() / MIN_REFILL_PERIOD.as_nanos())
            .unwrap_or(u64::MAX);

        if rate <= max_ticks {
            let period_nanos = per_second.as_nanos() / u128::from(rate);
            let period = Duration::from_nanos(u64::try_from(period_nanos).unwrap_or(u64::MAX));
            Self {
                period,
                ticks_per_second: rate,
                rate,
            }
        } else {
            Self {
                period: MIN_REFILL_PERIOD,
                ticks_per_second: max_ticks,
                rate,
            }
        }
    }

    /// Tokens to add on the `tick`-th tick of a second, counting from 1.
    ///
    /// Ticks past `ticks_per_second` wrap into the next second.
    pub fn tokens_on_tick(&self, tick: u64) -> u64 {
        let ticks = u128::from(self.ticks_per_second);
        let tick = (u128::from(tick.max(1)) - 1) % ticks + 1;
        let due = |n: u128| u128::from(self.rate) * n / ticks;
        u64::try_from(due(tick) - due(tick - 1)).unwrap_or(u64::MAX)
    }
}
