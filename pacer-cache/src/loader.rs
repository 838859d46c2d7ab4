//! Remote seam behind a read-through cache.

use crate::lookup::Lookup;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;

/// Default number of keys handed to a single `load_batch` call.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Source of truth for a [`ReadThroughCache`](crate::ReadThroughCache).
#[async_trait]
pub trait Loader<K, V>: Send + Sync
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Failure type; cloned to every waiter of a coalesced load.
    type Error: Clone + Send + Sync + 'static;

    /// Fetch a single key.
    async fn load(&self, key: &K) -> Lookup<V, Self::Error>;

    /// Fetch many keys at once.
    ///
    /// A requested key that is missing from the returned map is a confirmed
    /// absence. The default implementation calls [`load`](Self::load) for each
    /// key and fails on the first error.
    async fn load_batch(&self, keys: &[K]) -> Result<HashMap<K, V>, Self::Error> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            match self.load(key).await {
                Lookup::Found(value) => {
                    found.insert(key.clone(), value);
                }
                Lookup::NotFound => {}
                Lookup::Error(err) => return Err(err),
            }
        }
        Ok(found)
    }

    /// Largest chunk passed to [`load_batch`](Self::load_batch).
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }
}
