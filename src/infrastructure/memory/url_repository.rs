//! Capacity-bounded in-memory URL repository.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use parking_lot::Mutex;

use crate::domain::entities::UrlMapping;
use crate::domain::repositories::{InsertOutcome, UrlRepository};

/// Ordering key: soonest expiry first, insertion order breaks ties.
type ExpiryKey = (Instant, u64);

/// In-memory URL map holding at most `capacity` entries.
///
/// A secondary index ordered by expiry makes both capacity eviction and the
/// TTL sweep proportional to the number of entries they remove.
pub struct MemoryUrlRepository {
    inner: Mutex<Inner>,
    capacity: usize,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    by_expiry: BTreeMap<ExpiryKey, String>,
    next_seq: u64,
}

struct Entry {
    key: ExpiryKey,
    mapping: UrlMapping,
}

impl Inner {
    fn push(&mut self, mapping: UrlMapping) {
        let key = (mapping.expires_at, self.next_seq);
        self.next_seq += 1;
        self.by_expiry.insert(key, mapping.short_code.clone());
        self.entries
            .insert(mapping.short_code.clone(), Entry { key, mapping });
    }

    fn remove(&mut self, code: &str) -> Option<UrlMapping> {
        let entry = self.entries.remove(code)?;
        self.by_expiry.remove(&entry.key);
        Some(entry.mapping)
    }

    fn pop_soonest_expiring(&mut self) -> Option<String> {
        let (_, code) = self.by_expiry.pop_first()?;
        self.entries.remove(&code);
        Some(code)
    }
}

impl MemoryUrlRepository {
    /// Creates an empty repository bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl UrlRepository for MemoryUrlRepository {
    fn get(&self, code: &str, now: Instant) -> Option<UrlMapping> {
        let mut inner = self.inner.lock();

        let expired = inner.entries.get(code)?.mapping.is_expired_at(now);
        if expired {
            inner.remove(code);
            return None;
        }

        inner.entries.get(code).map(|entry| entry.mapping.clone())
    }

    fn insert(&self, mapping: UrlMapping) -> InsertOutcome {
        let mut inner = self.inner.lock();
        let now = mapping.created_at;

        if let Some(existing) = inner.entries.get(&mapping.short_code) {
            if !existing.mapping.is_expired_at(now) {
                return InsertOutcome::Collision;
            }
            inner.remove(&mapping.short_code);
        }

        let evicted = if inner.entries.len() >= self.capacity {
            inner.pop_soonest_expiring()
        } else {
            None
        };

        inner.push(mapping);
        InsertOutcome::Inserted { evicted }
    }

    fn remove(&self, code: &str) -> bool {
        self.inner.lock().remove(code).is_some()
    }

    fn remove_expired(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let mut removed = 0;

        while let Some(key) = inner.by_expiry.first_key_value().map(|(key, _)| *key) {
            if key.0 > now {
                break;
            }
            if let Some(code) = inner.by_expiry.remove(&key) {
                inner.entries.remove(&code);
            }
            removed += 1;
        }

        removed
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}
