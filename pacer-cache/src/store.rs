//! Bounded TTL store backing the read-through cache.

use crate::error::{CacheError, CacheResult};
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// Stored value; `None` records a confirmed absence.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: Option<V>,
    inserted_at: Instant,
}

/// What a store read found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Cached<V> {
    /// Live entry; `None` is a cached absence
    Hit(Option<V>),
    /// No entry
    Miss,
    /// Entry was past its TTL and has been dropped
    Expired,
}

pub(crate) struct Store<K, V> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(max_size: usize, ttl: Duration) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(max_size)
            .ok_or_else(|| CacheError::Config("max_size must be greater than 0".to_string()))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        })
    }

    /// Read a key, dropping it if its TTL has elapsed.
    pub(crate) fn read(&self, key: &K, now: Instant) -> Cached<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            None => return Cached::Miss,
            Some(entry) if now.duration_since(entry.inserted_at) <= self.ttl => {
                return Cached::Hit(entry.value.clone());
            }
            Some(_) => {}
        }
        entries.pop(key);
        Cached::Expired
    }

    /// Insert or replace a key. Returns true if another key was evicted.
    pub(crate) fn insert(&self, key: K, value: Option<V>, now: Instant) -> bool {
        let entry = CacheEntry {
            value,
            inserted_at: now,
        };
        let mut entries = self.entries.lock();
        match entries.push(key.clone(), entry) {
            Some((old_key, _)) => old_key != key,
            None => false,
        }
    }

    pub(crate) fn remove(&self, key: &K) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
