//! Read-through cache with coalesced loads.

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::loader::Loader;
use crate::lookup::Lookup;
use crate::stats::{CacheCounters, CacheStats};
use crate::store::{Cached, Store};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// A load in progress. Waiters subscribe to the channel; the sender is
/// dropped without a value if the owning reader is cancelled.
struct Flight<V, E> {
    tx: watch::Sender<Option<Lookup<V, E>>>,
}

type FlightMap<K, V, E> = Mutex<HashMap<K, Arc<Flight<V, E>>>>;
type Waiter<V, E> = watch::Receiver<Option<Lookup<V, E>>>;

/// Ownership of one key's flight. Dropping it retires the flight, whether
/// the load finished or the owner was cancelled.
struct FlightGuard<'a, K, V, E>
where
    K: Eq + Hash,
{
    inflight: &'a FlightMap<K, V, E>,
    key: K,
    flight: Arc<Flight<V, E>>,
}

impl<K, V, E> FlightGuard<'_, K, V, E>
where
    K: Eq + Hash,
{
    fn publish(&self, lookup: Lookup<V, E>) {
        self.flight.tx.send_replace(Some(lookup));
    }
}

impl<K, V, E> Drop for FlightGuard<'_, K, V, E>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        if inflight
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
        {
            inflight.remove(&self.key);
        }
    }
}

/// How a missed key gets its value.
enum Claim<'a, K, V, E>
where
    K: Eq + Hash,
{
    /// Stored by a load that settled after the first read
    Stored(Lookup<V, E>),
    /// This reader runs the load
    Owner(FlightGuard<'a, K, V, E>),
    /// Another reader is loading the key
    Joined(Waiter<V, E>),
}

/// Read-through cache in front of a [`Loader`].
///
/// Found values and confirmed absences are kept for the configured TTL,
/// bounded by an LRU of `max_size` keys. At most one load per key runs at a
/// time, across [`get`](Self::get) and [`get_all`](Self::get_all); concurrent
/// readers of the key share its result.
///
/// # Examples
///
/// ```no_run
/// use pacer_cache::*;
/// use async_trait::async_trait;
///
/// struct Squares;
///
/// #[async_trait]
/// impl Loader<u64, u64> for Squares {
///     type Error = String;
///
///     async fn load(&self, key: &u64) -> Lookup<u64, String> {
///         Lookup::Found(key * key)
///     }
/// }
///
/// # async fn example() -> Result<(), CacheError> {
/// let cache = ReadThroughCache::new(Squares, CacheConfig::default())?;
/// assert_eq!(cache.get(&4).await, Lookup::Found(16));
/// # Ok(())
/// # }
/// ```
pub struct ReadThroughCache<K, V, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: Loader<K, V>,
{
    loader: L,
    config: CacheConfig,
    store: Store<K, V>,
    inflight: FlightMap<K, V, L::Error>,
    counters: CacheCounters,
}

impl<K, V, L> ReadThroughCache<K, V, L>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: Loader<K, V>,
{
    /// Create a cache over `loader`.
    pub fn new(loader: L, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        let store = Store::new(config.max_size, config.ttl)?;
        debug!(
            ttl_ms = config.ttl.as_millis() as u64,
            max_size = config.max_size,
            "Read-through cache created"
        );
        Ok(Self {
            loader,
            config,
            store,
            inflight: Mutex::new(HashMap::new()),
            counters: CacheCounters::default(),
        })
    }

    /// Read one key.
    ///
    /// On a miss the loader is called at most once per key at a time; every
    /// concurrent reader of that key receives a clone of the same result.
    /// Errors are returned but never stored. If the reader running the load
    /// is cancelled, a waiting reader takes over.
    pub async fn get(&self, key: &K) -> Lookup<V, L::Error> {
        let mut missed = false;
        loop {
            if let Some(hit) = self.read_store(key) {
                return hit;
            }

            let claim = self.claim(&mut self.inflight.lock(), key);
            match claim {
                Claim::Stored(lookup) => return lookup,
                Claim::Owner(guard) => {
                    if !missed {
                        CacheCounters::bump(&self.counters.misses);
                    }
                    return self.load_and_settle(guard).await;
                }
                Claim::Joined(waiter) => {
                    if !missed {
                        CacheCounters::bump(&self.counters.misses);
                        missed = true;
                    }
                    CacheCounters::bump(&self.counters.coalesced);
                    trace!("Joining in-flight load");
                    if let Some(lookup) = Self::wait(waiter).await {
                        return lookup;
                    }
                    trace!("In-flight load abandoned; retrying");
                }
            }
        }
    }

    /// Read many keys, batching the misses.
    ///
    /// Results are returned in the order of `keys`, duplicates included.
    /// Missing keys are de-duplicated; those already loading elsewhere are
    /// awaited, the rest are loaded in chunks of at most
    /// [`Loader::max_batch_size`]. A key the batch does not return is stored
    /// as absent. Every key of a failed chunk resolves to that chunk's error.
    pub async fn get_all(&self, keys: &[K]) -> Vec<Lookup<V, L::Error>> {
        let mut slots: Vec<Option<Lookup<V, L::Error>>> = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();
        let mut missing = Vec::new();

        for key in keys {
            match self.read_store(key) {
                Some(hit) => slots.push(Some(hit)),
                None => {
                    if seen.insert(key.clone()) {
                        missing.push(key.clone());
                    }
                    slots.push(None);
                }
            }
        }

        if missing.is_empty() {
            return slots.into_iter().flatten().collect();
        }

        let mut resolved: HashMap<K, Lookup<V, L::Error>> = HashMap::with_capacity(missing.len());
        let mut owned = Vec::new();
        let mut joined = Vec::new();
        {
            let mut inflight = self.inflight.lock();
            for key in missing {
                match self.claim(&mut inflight, &key) {
                    Claim::Stored(lookup) => {
                        resolved.insert(key, lookup);
                    }
                    Claim::Owner(guard) => {
                        CacheCounters::bump(&self.counters.misses);
                        owned.push(guard);
                    }
                    Claim::Joined(waiter) => {
                        CacheCounters::bump(&self.counters.misses);
                        CacheCounters::bump(&self.counters.coalesced);
                        joined.push((key, waiter));
                    }
                }
            }
        }

        // Owned flights are settled before any joined one is awaited, so two
        // overlapping batches never wait on each other.
        if !owned.is_empty() {
            let chunk_size = self.loader.max_batch_size().max(1);
            debug!(
                keys = owned.len(),
                chunks = owned.len().div_ceil(chunk_size),
                joined = joined.len(),
                "Loading cache misses in batches"
            );
            let chunks = join_all(owned.chunks(chunk_size).map(|chunk| self.load_chunk(chunk))).await;
            resolved.extend(chunks.into_iter().flatten());
        }
        drop(owned);

        let waited = join_all(joined.into_iter().map(|(key, waiter)| async move {
            let lookup = match Self::wait(waiter).await {
                Some(lookup) => lookup,
                None => self.get(&key).await,
            };
            (key, lookup)
        }))
        .await;
        resolved.extend(waited);

        keys.iter()
            .zip(slots)
            .map(|(key, slot)| {
                slot.or_else(|| resolved.get(key).cloned())
                    .unwrap_or(Lookup::NotFound)
            })
            .collect()
    }

    /// Drop one key.
    pub fn invalidate(&self, key: &K) {
        self.store.remove(key);
    }

    /// Drop every key.
    pub fn invalidate_all(&self) {
        self.store.clear();
        debug!("Read-through cache cleared");
    }

    /// Number of stored keys, expired entries not yet read included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of keys with a load in progress.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The loader behind the cache.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn read_store(&self, key: &K) -> Option<Lookup<V, L::Error>> {
        match self.store.read(key, Instant::now()) {
            Cached::Hit(value) => {
                CacheCounters::bump(&self.counters.hits);
                Some(Lookup::from(value))
            }
            Cached::Expired => {
                CacheCounters::bump(&self.counters.expirations);
                None
            }
            Cached::Miss => None,
        }
    }

    fn insert(&self, key: K, value: Option<V>) {
        if self.store.insert(key, value, Instant::now()) {
            CacheCounters::bump(&self.counters.evictions);
        }
    }

    /// Decide who loads `key`. Called with the in-flight map locked, so the
    /// second read and the registration are atomic with respect to other readers.
    fn claim<'a>(
        &'a self,
        inflight: &mut HashMap<K, Arc<Flight<V, L::Error>>>,
        key: &K,
    ) -> Claim<'a, K, V, L::Error> {
        // A load may have settled between the first read and taking the lock
        if let Cached::Hit(value) = self.store.read(key, Instant::now()) {
            CacheCounters::bump(&self.counters.hits);
            return Claim::Stored(Lookup::from(value));
        }
        if let Some(flight) = inflight.get(key) {
            return Claim::Joined(flight.tx.subscribe());
        }

        let (tx, _) = watch::channel(None);
        let flight = Arc::new(Flight { tx });
        inflight.insert(key.clone(), flight.clone());
        Claim::Owner(FlightGuard {
            inflight: &self.inflight,
            key: key.clone(),
            flight,
        })
    }

    async fn wait(mut waiter: Waiter<V, L::Error>) -> Option<Lookup<V, L::Error>> {
        let settled = waiter.wait_for(Option::is_some).await.ok()?;
        (*settled).clone()
    }

    /// Run the loader for an owned key, store a settled result, then publish
    /// it. The flight is retired when `guard` drops, after the store write,
    /// so a reader arriving in between sees either the flight or the entry.
    async fn load_and_settle(&self, guard: FlightGuard<'_, K, V, L::Error>) -> Lookup<V, L::Error> {
        CacheCounters::bump(&self.counters.loads);
        let result = self.loader.load(&guard.key).await;

        match result.settled() {
            Some(value) => self.insert(guard.key.clone(), value),
            None => {
                CacheCounters::bump(&self.counters.load_failures);
                debug!("Load failed; result not cached");
            }
        }

        guard.publish(result.clone());
        result
    }

    /// Load one chunk of owned keys with a single batch call.
    async fn load_chunk(
        &self,
        chunk: &[FlightGuard<'_, K, V, L::Error>],
    ) -> Vec<(K, Lookup<V, L::Error>)> {
        let keys: Vec<K> = chunk.iter().map(|guard| guard.key.clone()).collect();
        CacheCounters::bump(&self.counters.loads);

        match self.loader.load_batch(&keys).await {
            Ok(mut found) => chunk
                .iter()
                .map(|guard| {
                    let value = found.remove(&guard.key);
                    self.insert(guard.key.clone(), value.clone());
                    let lookup = Lookup::from(value);
                    guard.publish(lookup.clone());
                    (guard.key.clone(), lookup)
                })
                .collect(),
            Err(err) => {
                CacheCounters::bump(&self.counters.load_failures);
                warn!(keys = chunk.len(), "Batch load failed");
                chunk
                    .iter()
                    .map(|guard| {
                        let lookup = Lookup::Error(err.clone());
                        guard.publish(lookup.clone());
                        (guard.key.clone(), lookup)
                    })
                    .collect()
            }
        }
    }
}
