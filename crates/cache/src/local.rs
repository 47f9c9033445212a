//! In-process TTL cache backed by DashMap for lock-free concurrent access.
//!
//! Owned by whoever constructs it (created at startup, dropped at shutdown);
//! there is no module-level cache state.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded TTL cache. Values are cloned out on read.
pub struct LocalCache<K, V> {
    name: &'static str,
    store: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> LocalCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, max_entries: usize) -> Self {
        Self {
            name,
            store: DashMap::with_capacity(max_entries.min(1024)),
            ttl,
            max_entries,
        }
    }

    /// Get a value, returns None if expired or missing.
    pub fn get(&self, key: &K) -> Option<V> {
        let Some(entry) = self.store.get(key) else {
            metrics::counter!("cache.local.miss", "cache" => self.name).increment(1);
            return None;
        };
        if entry.inserted_at.elapsed() >= self.ttl {
            drop(entry);
            self.store.remove(key);
            metrics::counter!("cache.local.expired", "cache" => self.name).increment(1);
            return None;
        }
        metrics::counter!("cache.local.hit", "cache" => self.name).increment(1);
        Some(entry.value.clone())
    }

    /// Insert or update a value.
    pub fn put(&self, key: K, value: V) {
        // Over capacity: skip new keys, maintenance frees room.
        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            return;
        }
        self.store.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.store.remove(key);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Remove expired entries. Call this periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        self.store
            .retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        let evicted = before.saturating_sub(self.store.len());
        if evicted > 0 {
            debug!(cache = self.name, evicted, "Local cache eviction complete");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
