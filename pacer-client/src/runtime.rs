//! Composition of throttling, retry and classification around a transport.

use crate::classifier::{Classified, classify_response, classify_transport_error};
use crate::error::{ClientError, ClientResult};
use crate::loader::RemoteLoader;
use crate::middleware::{Middleware, MiddlewareChain, ThrottleMiddleware, TracingMiddleware};
use crate::outcome::{Failure, Outcome};
use crate::request::{NotFoundPolicy, RequestSpec};
use crate::response::RawResponse;
use crate::retry::{RetryConfig, RetryController};
use crate::transport::Transport;
use pacer_cache::{CacheConfig, Lookup, ReadThroughCache};
use pacer_ratelimit::{RateController, RateControllerConfig};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Entry point for remote calls.
///
/// Every call runs the retry loop around the middleware chain
/// `[custom..., throttle, tracing] -> transport`. Each attempt waits for a
/// rate permit, and each attempt that yields a status feeds it back into the
/// shared [`RateController`]. Cloning is cheap and clones share all state.
///
/// # Examples
///
/// ```no_run
/// use pacer_client::*;
/// use std::time::Duration;
///
/// # async fn example() -> ClientResult<()> {
/// let transport = HttpTransport::new(
///     HttpTransportConfig::builder().base_url("https://api.example.com").build(),
/// )?;
///
/// let runtime = InvocationRuntime::builder()
///     .transport(transport)
///     .rate(RateControllerConfig::new(20.0, 0.1))
///     .retry(RetryConfig::fixed(Duration::from_secs(30)).with_max_attempts(10))
///     .build()?;
///
/// let outcome = runtime.call_json::<serde_json::Value>(&RequestSpec::get("/users/42")).await?;
/// if outcome.is_permanent() {
///     eprintln!("giving up: {}", outcome.errors().unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InvocationRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    chain: MiddlewareChain,
    rate: Arc<RateController>,
    retry: RetryController,
}

impl InvocationRuntime {
    /// Create a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Perform a call whose response body is not needed.
    pub async fn call(&self, request: &RequestSpec) -> ClientResult<Outcome<()>> {
        self.call_with(request, |_| Ok::<_, Infallible>(())).await
    }

    /// Perform a call and decode a successful body as JSON.
    pub async fn call_json<T>(&self, request: &RequestSpec) -> ClientResult<Outcome<T>>
    where
        T: DeserializeOwned,
    {
        self.call_with(request, |response| {
            serde_json::from_slice::<T>(response.bytes())
        })
        .await
    }

    /// Perform a call and return a successful body as text.
    pub async fn call_text(&self, request: &RequestSpec) -> ClientResult<Outcome<String>> {
        self.call_with(request, |response| {
            String::from_utf8(response.bytes().to_vec())
        })
        .await
    }

    /// Perform a call, decoding a successful body with `decode`.
    ///
    /// Transient failures are retried per the runtime's [`RetryConfig`]; what
    /// survives comes back as [`ClientError::Transient`] or
    /// [`ClientError::RetryExhausted`]. Everything with a status is returned
    /// as an [`Outcome`].
    pub async fn call_with<E, D, DE>(
        &self,
        request: &RequestSpec,
        decode: D,
    ) -> ClientResult<Outcome<E>>
    where
        D: Fn(&RawResponse) -> Result<E, DE>,
        DE: fmt::Display,
    {
        let inner = self.inner.as_ref();
        let decode = &decode;
        let description = request.description();

        let outcome = inner
            .retry
            .run(&description, move || async move {
                match inner.chain.execute(request).await {
                    Ok(response) => classify_response(&response, request, decode),
                    Err(error) => match classify_transport_error(&error, request) {
                        Classified::Outcome(outcome) => Ok(outcome),
                        Classified::Transient(error) => Err(ClientError::Transient(error)),
                    },
                }
            })
            .await?;

        debug!(
            description = %description,
            status = %outcome.status(),
            "Remote call finished"
        );
        Ok(outcome)
    }

    /// Perform a JSON lookup, reporting a transport "not found" as absent.
    pub async fn lookup_json<T>(&self, request: &RequestSpec) -> ClientResult<Lookup<T, Failure>>
    where
        T: DeserializeOwned,
    {
        let request = request.clone().not_found(NotFoundPolicy::Absent);
        Ok(self.call_json(&request).await?.into_lookup())
    }

    /// Build a loader whose single-key reads go through this runtime.
    pub fn loader<K, V, R, D, DE>(&self, request: R, decode: D) -> RemoteLoader<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        R: Fn(&K) -> RequestSpec + Send + Sync + 'static,
        D: Fn(&RawResponse) -> Result<V, DE> + Send + Sync + 'static,
        DE: fmt::Display,
    {
        RemoteLoader::new(self.clone(), request, decode)
    }

    /// Build a loader decoding JSON bodies.
    pub fn json_loader<K, V, R>(&self, request: R) -> RemoteLoader<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: DeserializeOwned + Clone + Send + Sync + 'static,
        R: Fn(&K) -> RequestSpec + Send + Sync + 'static,
    {
        self.loader(request, |response: &RawResponse| {
            serde_json::from_slice::<V>(response.bytes())
        })
    }

    /// Put a read-through cache in front of `loader`.
    ///
    /// Hits are served from memory without a permit; misses go through this
    /// runtime and feed its rate.
    pub fn read_through<K, V>(
        &self,
        loader: RemoteLoader<K, V>,
        config: CacheConfig,
    ) -> ClientResult<ReadThroughCache<K, V, RemoteLoader<K, V>>>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Ok(ReadThroughCache::new(loader, config)?)
    }

    /// Shared rate controller.
    pub fn rate_controller(&self) -> &Arc<RateController> {
        &self.inner.rate
    }

    /// Current permitted calls per second.
    pub fn current_rate(&self) -> f64 {
        self.inner.rate.current_rate()
    }

    /// Retry policy in effect.
    pub fn retry_config(&self) -> &RetryConfig {
        self.inner.retry.config()
    }
}

impl fmt::Debug for InvocationRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationRuntime")
            .field("rate", &self.inner.rate.snapshot())
            .field("retry", self.inner.retry.config())
            .field("middlewares", &self.inner.chain.len())
            .finish()
    }
}

/// Builder for [`InvocationRuntime`].
pub struct RuntimeBuilder {
    transport: Option<Arc<dyn Transport>>,
    rate: RateControllerConfig,
    rate_controller: Option<Arc<RateController>>,
    retry: RetryConfig,
    count_not_found_as_failure: bool,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            rate: RateControllerConfig::default(),
            rate_controller: None,
            retry: RetryConfig::default(),
            count_not_found_as_failure: true,
            middlewares: Vec::new(),
        }
    }
}

impl RuntimeBuilder {
    /// Set the transport. Required.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set a shared transport.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configure a rate controller owned by this runtime.
    pub fn rate(mut self, config: RateControllerConfig) -> Self {
        self.rate = config;
        self
    }

    /// Share an existing rate controller, e.g. with other runtimes hitting
    /// the same service. Takes precedence over [`rate`](Self::rate).
    pub fn rate_controller(mut self, controller: Arc<RateController>) -> Self {
        self.rate_controller = Some(controller);
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Whether `NOTFOUND` lowers the rate unless a call says otherwise.
    /// Defaults to true.
    pub fn count_not_found_as_failure(mut self, count: bool) -> Self {
        self.count_not_found_as_failure = count;
        self
    }

    /// Add a middleware outside the throttle; it runs once per attempt.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Build the runtime.
    pub fn build(self) -> ClientResult<InvocationRuntime> {
        let transport = self
            .transport
            .ok_or_else(|| ClientError::Config("a transport is required".to_string()))?;

        let rate = match self.rate_controller {
            Some(controller) => controller,
            None => Arc::new(RateController::new(self.rate)?),
        };

        let throttle = ThrottleMiddleware::new(rate.clone())
            .count_not_found_as_failure(self.count_not_found_as_failure);

        let chain = self
            .middlewares
            .into_iter()
            .fold(MiddlewareChain::new(transport), MiddlewareChain::with_shared)
            .with_middleware(throttle)
            .with_middleware(TracingMiddleware);

        debug!(
            base_rate = rate.base_rate(),
            min_rate = rate.min_rate(),
            retry_enabled = self.retry.enabled,
            "Invocation runtime built"
        );

        Ok(InvocationRuntime {
            inner: Arc::new(RuntimeInner {
                chain,
                rate,
                retry: RetryController::new(self.retry),
            }),
        })
    }
}
