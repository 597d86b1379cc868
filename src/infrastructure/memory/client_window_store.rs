//! Per-client request timestamp logs with a bound on tracked clients.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

/// Scans tried before a full store refuses a new client.
const EVICTION_ATTEMPTS: usize = 3;

/// Ordered request timestamps of a single client.
#[derive(Debug)]
pub struct ClientWindow {
    timestamps: VecDeque<Instant>,
    last_seen: Instant,
}

impl ClientWindow {
    fn new(now: Instant) -> Self {
        Self {
            timestamps: VecDeque::new(),
            last_seen: now,
        }
    }

    /// Drops every timestamp at least `window` older than `now`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) < window {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    /// Appends a request timestamp.
    ///
    /// Timestamps stay non-decreasing even if `now` was sampled slightly
    /// before the previous record.
    pub fn record(&mut self, now: Instant) {
        let now = self.timestamps.back().map_or(now, |&last| now.max(last));
        self.timestamps.push_back(now);
    }

    /// Number of timestamps currently held.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    fn touch(&mut self, now: Instant) {
        self.last_seen = self.last_seen.max(now);
    }
}

/// Concurrent map of client identity → [`ClientWindow`].
///
/// Windows live in a sharded [`DashMap`], so requests from different clients
/// only contend when they hash to the same shard, while all mutations of one
/// client's window are serialised by its shard lock. Creating a new window
/// goes through a separate admission lock so the tracked-client bound holds
/// exactly.
pub struct ClientWindowStore {
    clients: DashMap<String, ClientWindow>,
    capacity: usize,
    admission: Mutex<()>,
}

impl ClientWindowStore {
    /// Creates a store tracking at most `capacity` clients.
    pub fn new(capacity: usize) -> Self {
        Self {
            clients: DashMap::new(),
            capacity,
            admission: Mutex::new(()),
        }
    }

    /// Runs `f` on the window of `client` while holding its lock.
    ///
    /// A window is created for unseen clients, evicting the least recently
    /// active client when the store is full.
    ///
    /// # Returns
    ///
    /// - `Some(result)` of `f`
    /// - `None` if `client` is new and no room could be freed for it
    pub fn with_window<R>(
        &self,
        client: &str,
        f: impl FnOnce(&mut ClientWindow, Instant) -> R,
    ) -> Option<R> {
        if let Some(mut window) = self.clients.get_mut(client) {
            return Some(apply(window.value_mut(), f));
        }

        let _admission = self.admission.lock();

        // Another request from the same client may have won the race.
        if let Some(mut window) = self.clients.get_mut(client) {
            return Some(apply(window.value_mut(), f));
        }

        if self.clients.len() >= self.capacity && !self.evict_least_recent() {
            return None;
        }

        let mut window = ClientWindow::new(Instant::now());
        let result = apply(&mut window, f);
        self.clients.insert(client.to_owned(), window);
        Some(result)
    }

    /// Removes clients whose last request is at least `idle_ttl` old.
    ///
    /// Returns the number of clients removed.
    pub fn remove_idle(&self, idle_ttl: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.clients.retain(|_, window| {
            let keep = now.saturating_duration_since(window.last_seen) < idle_ttl;
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evicts the client with the oldest `last_seen`.
    ///
    /// A candidate that became active again between the scan and the removal
    /// is kept and the scan repeats, up to [`EVICTION_ATTEMPTS`] times.
    fn evict_least_recent(&self) -> bool {
        self.evict_least_recent_with(|_, _| {})
    }

    /// Eviction loop with a hook that runs between each scan and removal.
    fn evict_least_recent_with(&self, mut between: impl FnMut(&Self, &str)) -> bool {
        for attempt in 1..=EVICTION_ATTEMPTS {
            let candidate = self
                .clients
                .iter()
                .min_by_key(|entry| entry.value().last_seen)
                .map(|entry| (entry.key().clone(), entry.value().last_seen));

            let Some((client, last_seen)) = candidate else {
                return false;
            };

            between(self, &client);

            let evicted = self
                .clients
                .remove_if(&client, |_, window| window.last_seen == last_seen)
                .is_some();

            if evicted {
                debug!(client = %client, attempt, "Evicted least recently active client");
                return true;
            }
        }

        debug!("No idle client could be evicted");
        false
    }
}

fn apply<R>(window: &mut ClientWindow, f: impl FnOnce(&mut ClientWindow, Instant) -> R) -> R {
    let now = Instant::now();
    window.touch(now);
    f(window, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn hit(store: &ClientWindowStore, client: &str) -> Option<usize> {
        store.with_window(client, |window, now| {
            window.record(now);
            window.len()
        })
    }

    #[test]
    fn test_window_prune_drops_old_timestamps() {
        let start = Instant::now();
        let mut window = ClientWindow::new(start);

        window.record(start);
        window.record(start + Duration::from_millis(500));
        window.record(start + Duration::from_millis(900));

        window.prune(start + Duration::from_millis(1000), Duration::from_secs(1));
        assert_eq!(window.len(), 2);

        window.prune(start + Duration::from_millis(1600), Duration::from_secs(1));
        assert_eq!(window.len(), 1);

        window.prune(start + Duration::from_secs(5), Duration::from_secs(1));
        assert!(window.is_empty());
    }

    #[test]
    fn test_window_record_is_non_decreasing() {
        let start = Instant::now();
        let mut window = ClientWindow::new(start);

        window.record(start + Duration::from_millis(10));
        window.record(start);

        let stamps: Vec<_> = window.timestamps.iter().copied().collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_store_creates_and_reuses_windows() {
        let store = ClientWindowStore::new(10);

        assert_eq!(hit(&store, "a"), Some(1));
        assert_eq!(hit(&store, "a"), Some(2));
        assert_eq!(hit(&store, "b"), Some(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_evicts_least_recently_active() {
        let store = ClientWindowStore::new(2);

        hit(&store, "old");
        thread::sleep(Duration::from_millis(5));
        hit(&store, "recent");
        thread::sleep(Duration::from_millis(5));
        hit(&store, "new");

        assert_eq!(store.len(), 2);
        assert!(store.clients.contains_key("recent"));
        assert!(store.clients.contains_key("new"));
        assert!(!store.clients.contains_key("old"));
    }

    #[test]
    fn test_store_activity_refreshes_recency() {
        let store = ClientWindowStore::new(2);

        hit(&store, "first");
        thread::sleep(Duration::from_millis(5));
        hit(&store, "second");
        thread::sleep(Duration::from_millis(5));
        hit(&store, "first");
        thread::sleep(Duration::from_millis(5));
        hit(&store, "third");

        assert!(store.clients.contains_key("first"));
        assert!(!store.clients.contains_key("second"));
    }

    #[test]
    fn test_store_with_zero_capacity_rejects_new_clients() {
        let store = ClientWindowStore::new(0);

        assert_eq!(hit(&store, "anyone"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_idle() {
        let store = ClientWindowStore::new(10);

        hit(&store, "idle");
        thread::sleep(Duration::from_millis(60));
        hit(&store, "active");

        let removed = store.remove_idle(Duration::from_millis(50));

        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.clients.contains_key("active"));
    }

    #[test]
    fn test_concurrent_clients_keep_independent_windows() {
        let store = Arc::new(ClientWindowStore::new(64));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    let client = format!("client-{i}");
                    for _ in 0..200 {
                        hit(&store, &client);
                    }
                    client
                })
            })
            .collect();

        for handle in handles {
            let client = handle.join().unwrap();
            let len = store.with_window(&client, |window, _| window.len());
            assert_eq!(len, Some(200), "window of {client} was corrupted");
        }
        assert_eq!(store.len(), 16);
    }

    #[test]
    fn test_capacity_bound_holds_under_contention() {
        let store = Arc::new(ClientWindowStore::new(8));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        hit(&store, &format!("t{t}-c{i}"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(store.len() <= 8);
    }

    #[test]
    fn test_eviction_retries_when_candidate_becomes_active() {
        let store = ClientWindowStore::new(2);
        hit(&store, "a");
        thread::sleep(Duration::from_millis(2));
        hit(&store, "b");

        let mut touched = Vec::new();
        let evicted = store.evict_least_recent_with(|store, client| {
            if touched.is_empty() {
                if let Some(mut window) = store.clients.get_mut(client) {
                    window.last_seen += Duration::from_secs(60);
                }
            }
            touched.push(client.to_string());
        });

        assert!(evicted);
        assert_eq!(touched, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.len(), 1);
        assert!(store.clients.contains_key("a"));
    }

    #[test]
    fn test_eviction_gives_up_after_repeated_races() {
        let store = ClientWindowStore::new(1);
        hit(&store, "busy");

        let mut attempts = 0;
        let evicted = store.evict_least_recent_with(|store, client| {
            attempts += 1;
            if let Some(mut window) = store.clients.get_mut(client) {
                window.last_seen += Duration::from_millis(1);
            }
        });

        assert!(!evicted);
        assert_eq!(attempts, EVICTION_ATTEMPTS);
        assert_eq!(store.len(), 1);
    }
}
