//! Cache loader backed by an [`InvocationRuntime`].

use crate::error::ClientError;
use crate::outcome::Failure;
use crate::request::{NotFoundPolicy, RequestSpec};
use crate::response::RawResponse;
use crate::runtime::InvocationRuntime;
use crate::status::Status;
use async_trait::async_trait;
use futures::future::join_all;
use pacer_cache::{DEFAULT_MAX_BATCH_SIZE, Loader, Lookup};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

type RequestFn<K> = Arc<dyn Fn(&K) -> RequestSpec + Send + Sync>;
type BatchRequestFn<K> = Arc<dyn Fn(&[K]) -> RequestSpec + Send + Sync>;
type DecodeFn<T> = Arc<dyn Fn(&RawResponse) -> Result<T, String> + Send + Sync>;

struct Batch<K, V> {
    request: BatchRequestFn<K>,
    decode: DecodeFn<HashMap<K, V>>,
    max_size: usize,
}

/// [`Loader`] that turns keys into requests and runs them through a runtime.
///
/// Single-key requests report a transport "not found" as absent, so a
/// missing key is cached rather than treated as a failure. Without a batch
/// request, batch loads fall back to concurrent single-key calls, still paced
/// by the runtime's rate controller.
pub struct RemoteLoader<K, V> {
    runtime: InvocationRuntime,
    request: RequestFn<K>,
    decode: DecodeFn<V>,
    batch: Option<Batch<K, V>>,
}

impl<K, V> RemoteLoader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a loader for single-key requests.
    pub fn new<R, D, DE>(runtime: InvocationRuntime, request: R, decode: D) -> Self
    where
        R: Fn(&K) -> RequestSpec + Send + Sync + 'static,
        D: Fn(&RawResponse) -> Result<V, DE> + Send + Sync + 'static,
        DE: fmt::Display,
    {
        Self {
            runtime,
            request: Arc::new(request),
            decode: Arc::new(move |response: &RawResponse| {
                decode(response).map_err(|e| e.to_string())
            }),
            batch: None,
        }
    }

    /// Load many keys with one request per chunk of at most `max_size` keys.
    ///
    /// `decode` returns the entries found; requested keys it leaves out are
    /// confirmed absent.
    pub fn with_batch<R, D, DE>(mut self, request: R, decode: D, max_size: usize) -> Self
    where
        R: Fn(&[K]) -> RequestSpec + Send + Sync + 'static,
        D: Fn(&RawResponse) -> Result<HashMap<K, V>, DE> + Send + Sync + 'static,
        DE: fmt::Display,
    {
        self.batch = Some(Batch {
            request: Arc::new(request),
            decode: Arc::new(move |response: &RawResponse| {
                decode(response).map_err(|e| e.to_string())
            }),
            max_size: max_size.max(1),
        });
        self
    }

    /// Runtime the loader calls through.
    pub fn runtime(&self) -> &InvocationRuntime {
        &self.runtime
    }

    async fn load_each(&self, keys: &[K]) -> Result<HashMap<K, V>, Failure> {
        let lookups = join_all(keys.iter().map(|key| self.load(key))).await;
        let mut found = HashMap::with_capacity(keys.len());
        for (key, lookup) in keys.iter().zip(lookups) {
            match lookup {
                Lookup::Found(value) => {
                    found.insert(key.clone(), value);
                }
                Lookup::NotFound => {}
                Lookup::Error(failure) => return Err(failure),
            }
        }
        Ok(found)
    }
}

/// Failure payload for an error that never produced a status.
fn failure_from(error: &ClientError) -> Failure {
    let status = if error.is_transient() {
        Status::Error
    } else {
        Status::FatalError
    };
    warn!(error = %error, "Remote load failed without an outcome");
    Failure {
        status,
        message: error.to_string(),
    }
}

#[async_trait]
impl<K, V> Loader<K, V> for RemoteLoader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Error = Failure;

    async fn load(&self, key: &K) -> Lookup<V, Failure> {
        let request = (self.request)(key).not_found(NotFoundPolicy::Absent);
        let decode = &self.decode;
        match self.runtime.call_with(&request, |r| decode(r)).await {
            Ok(outcome) => outcome.into_lookup(),
            Err(error) => Lookup::Error(failure_from(&error)),
        }
    }

    async fn load_batch(&self, keys: &[K]) -> Result<HashMap<K, V>, Failure> {
        let Some(batch) = &self.batch else {
            return self.load_each(keys).await;
        };

        let request = (batch.request)(keys).not_found(NotFoundPolicy::Absent);
        let decode = &batch.decode;
        match self.runtime.call_with(&request, |r| decode(r)).await {
            Ok(outcome) => match outcome.into_lookup() {
                Lookup::Found(found) => Ok(found),
                Lookup::NotFound => Ok(HashMap::new()),
                Lookup::Error(failure) => Err(failure),
            },
            Err(error) => Err(failure_from(&error)),
        }
    }

    fn max_batch_size(&self) -> usize {
        self.batch
            .as_ref()
            .map_or(DEFAULT_MAX_BATCH_SIZE, |batch| batch.max_size)
    }
}
