//! Periodic background workers with an explicit stop signal.
//!
//! Token refill and both sweeps run on one of these. Each worker owns a
//! dedicated Tokio task that wakes on a fixed schedule and exits as soon as
//! [`PeriodicWorker::stop`] is called or the worker is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Longest period a worker will wait between ticks.
const MAX_PERIOD: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Handle to a task that runs a closure once per period.
pub struct PeriodicWorker {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    stopped: AtomicBool,
    handle: JoinHandle<()>,
}

impl PeriodicWorker {
    /// Spawns a worker that calls `task` every `period`.
    ///
    /// The first call happens one full period after spawning, not immediately.
    /// Periods beyond roughly 30 years are capped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F>(
        name: &'static str,
        period: Duration,
        missed_ticks: MissedTickBehavior,
        mut task: F,
    ) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = period.min(MAX_PERIOD);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(missed_ticks);
            debug!(worker = name, ?period, "Worker started");

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => task(),
                }
            }

            debug!(worker = name, "Worker stopped");
        });

        Self {
            name,
            stop_tx,
            stopped: AtomicBool::new(false),
            handle,
        }
    }

    /// Signals the worker to exit.
    ///
    /// Returns `true` only for the call that actually stopped it; later calls
    /// are no-ops.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }

        // The task may already be gone; nothing left to signal then.
        let _ = self.stop_tx.send(true);
        debug!(worker = self.name, "Stop requested");
        true
    }

    /// Returns whether the worker has neither been stopped nor exited.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_worker_runs_periodically() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        let worker = PeriodicWorker::spawn(
            "test",
            Duration::from_millis(10),
            MissedTickBehavior::Delay,
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.stop();

        assert!(counter.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_first_tick_is_delayed() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        let _worker = PeriodicWorker::spawn(
            "delayed",
            Duration::from_secs(60),
            MissedTickBehavior::Skip,
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let worker = PeriodicWorker::spawn(
            "idempotent",
            Duration::from_millis(5),
            MissedTickBehavior::Skip,
            || {},
        );

        assert!(worker.is_running());
        assert!(worker.stop());
        assert!(!worker.stop());
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn test_stopped_worker_no_longer_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        let worker = PeriodicWorker::spawn(
            "halt",
            Duration::from_millis(5),
            MissedTickBehavior::Skip,
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        worker.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_oversized_period_is_capped() {
        let worker = PeriodicWorker::spawn(
            "far-future",
            Duration::from_secs(u64::MAX),
            MissedTickBehavior::Skip,
            || {},
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(worker.is_running());
        assert!(worker.stop());
    }
}
