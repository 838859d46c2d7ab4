//! Middleware chain around a transport.

use crate::classifier::{Classified, classify_status, classify_transport_error};
use crate::request::{CallOptions, RequestSpec};
use crate::response::RawResponse;
use crate::status::Status;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use pacer_ratelimit::RateController;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, debug_span};

/// Result of one pass through the chain.
pub type Exchange = Result<RawResponse, TransportError>;

/// Middleware trait for wrapping each attempt of a call.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and call the next middleware.
    async fn handle(&self, request: &RequestSpec, next: Next<'_>) -> Exchange;
}

/// Remainder of the chain, ending at the transport.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl Next<'_> {
    /// Continue to the next middleware, or the transport at the end.
    pub async fn run(self, request: &RequestSpec) -> Exchange {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    transport: self.transport,
                };
                current.handle(request, next).await
            }
            None => self.transport.execute(request).await,
        }
    }
}

/// Chain of middleware handlers.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl MiddlewareChain {
    /// Create a chain that goes straight to `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            middlewares: Vec::new(),
            transport,
        }
    }

    /// Add a middleware to the chain, inside the ones already added.
    pub fn with_middleware<M: Middleware + 'static>(self, middleware: M) -> Self {
        self.with_shared(Arc::new(middleware))
    }

    /// Add a shared middleware.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Number of middlewares.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if requests go straight to the transport.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the request through the middleware chain.
    pub async fn execute(&self, request: &RequestSpec) -> Exchange {
        let next = Next {
            middlewares: &self.middlewares,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }
}

/// Paces attempts with a [`RateController`] and feeds their results back.
///
/// A permit is taken before every attempt. Ok statuses raise the rate and
/// retryable ones lower it; `NOTFOUND` only counts when configured to.
/// Permanent statuses and transient transport failures leave it alone.
pub struct ThrottleMiddleware {
    rate: Arc<RateController>,
    count_not_found_as_failure: bool,
}

impl ThrottleMiddleware {
    /// Create a throttle over a shared controller.
    pub fn new(rate: Arc<RateController>) -> Self {
        Self {
            rate,
            count_not_found_as_failure: true,
        }
    }

    /// Default for whether `NOTFOUND` lowers the rate; calls may override it.
    pub fn count_not_found_as_failure(mut self, count: bool) -> Self {
        self.count_not_found_as_failure = count;
        self
    }

    fn feedback(&self, status: Status, options: CallOptions) {
        let count_not_found = options
            .count_not_found_as_failure
            .unwrap_or(self.count_not_found_as_failure);

        if status.is_ok() {
            self.rate.increase();
        } else if status.needs_retry() && (status != Status::NotFound || count_not_found) {
            self.rate.decrease();
        }
    }
}

#[async_trait]
impl Middleware for ThrottleMiddleware {
    async fn handle(&self, request: &RequestSpec, next: Next<'_>) -> Exchange {
        self.rate.acquire().await;
        let result = next.run(request).await;

        let options = request.options();
        let status = match &result {
            Ok(response) => Some(classify_status(response.status(), response.headers())),
            Err(error) => match classify_transport_error::<()>(error, request) {
                Classified::Outcome(outcome) => Some(outcome.status()),
                Classified::Transient(_) => None,
            },
        };
        if let Some(status) = status {
            self.feedback(status, options);
        }

        result
    }
}

/// Emits a debug span and a completion event per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(&self, request: &RequestSpec, next: Next<'_>) -> Exchange {
        let span = debug_span!(
            "remote_call",
            method = %request.method(),
            url = request.url(),
            description = %request.description(),
        );

        async move {
            let start = std::time::Instant::now();
            let result = next.run(request).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => debug!(status = response.status().as_u16(), elapsed_ms, "Call completed"),
                Err(error) => debug!(error = %error, elapsed_ms, "Call failed in transport"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Bounds each attempt; an overrun is an I/O failure (`ERROR`).
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    /// Create a new timeout middleware.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Middleware for TimeoutMiddleware {
    async fn handle(&self, request: &RequestSpec, next: Next<'_>) -> Exchange {
        match tokio::time::timeout(self.timeout, next.run(request)).await {
            Ok(result) => result,
            Err(elapsed) => Err(TransportError::io(elapsed)),
        }
    }
}
