use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded LRU cache whose entries expire a fixed time after insertion.
/// Expiry is checked on access; nothing runs in the background.
pub struct TtlCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        Self::live_value(&mut entries, key, self.ttl)
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().put(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Returns the live value for `key`, or stores and returns `make()`.
    /// Lookup and insert happen under one lock, so concurrent callers for the
    /// same key all observe the first caller's value.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        let mut entries = self.entries.lock();
        if let Some(value) = Self::live_value(&mut entries, &key, self.ttl) {
            return value;
        }
        let value = make();
        entries.put(
            key,
            CacheEntry {
                value: value.clone(),
                inserted_at: Instant::now(),
            },
        );
        value
    }

    /// Removes the entry for `key` if `predicate` holds for its value.
    pub fn remove_if<F>(&self, key: &K, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        let mut entries = self.entries.lock();
        let matches = entries
            .peek(key)
            .is_some_and(|entry| predicate(&entry.value));
        if matches {
            entries.pop(key);
        }
        matches
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_value(entries: &mut LruCache<K, CacheEntry<V>>, key: &K, ttl: Duration) -> Option<V> {
        let expired = entries
            .peek(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= ttl);
        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }
}
