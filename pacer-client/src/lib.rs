//! # Pacer Client
//!
//! Resilient remote invocation: every call is paced by an adaptive rate
//! controller, its result is classified into a fixed status taxonomy,
//! transient failures are waited out and retried, and lookups can be served
//! through a read-through cache.
//!
//! ## Features
//!
//! - **Outcome classification**: HTTP responses and transport failures map onto
//!   [`Status`] (`SUCCESS`, `ERROR`, `NOTFOUND`, `DENIED`, ...)
//! - **Adaptive throttling**: AIMD pacing shared by every caller of a runtime
//! - **Retry**: transient failures (503, 500, connection reset) are retried
//!   with configurable backoff
//! - **Read-through caching**: remote loaders plugged into [`ReadThroughCache`]
//! - **Middleware**: custom per-attempt wrappers around the transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pacer_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(
//!         HttpTransportConfig::builder()
//!             .base_url("https://api.example.com")
//!             .build(),
//!     )?;
//!
//!     let runtime = InvocationRuntime::builder()
//!         .transport(transport)
//!         .rate(RateControllerConfig::new(10.0, 0.5))
//!         .build()?;
//!
//!     let outcome = runtime.call_text(&RequestSpec::get("/health")).await?;
//!     println!("Status: {}", outcome.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Read-through Cache
//!
//! ```rust,no_run
//! use pacer_client::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Clone, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! # async fn example(runtime: InvocationRuntime) -> ClientResult<()> {
//! let loader = runtime.json_loader::<u64, User, _>(|id| RequestSpec::get(format!("/users/{id}")));
//! let users = runtime.read_through(loader, CacheConfig::default().with_ttl_secs(60))?;
//!
//! if let Lookup::Found(user) = users.get(&42).await {
//!     println!("{}", user.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod http_transport;
pub mod loader;
pub mod middleware;
pub mod outcome;
pub mod request;
pub mod response;
pub mod retry;
pub mod runtime;
pub mod status;
pub mod testing;
pub mod transport;

pub use classifier::{
    Classified, VALIDATION_EXCEPTION_HEADER, classify_response, classify_status,
    classify_transport_error,
};
pub use config::{HttpTransportConfig, HttpTransportConfigBuilder, RaisedStatuses};
pub use error::{ClientError, ClientResult};
pub use http_transport::HttpTransport;
pub use loader::RemoteLoader;
pub use middleware::{
    Exchange, Middleware, MiddlewareChain, Next, ThrottleMiddleware, TimeoutMiddleware,
    TracingMiddleware,
};
pub use outcome::{Cause, Failure, Outcome};
pub use request::{CallOptions, NotFoundPolicy, RequestSpec};
pub use response::RawResponse;
pub use retry::{BackoffStrategy, DEFAULT_RETRY_WAIT, RetryConfig, RetryController, RetryState};
pub use runtime::{InvocationRuntime, RuntimeBuilder};
pub use status::Status;
pub use transport::{Transport, TransportError};

// Re-export the rate controller and cache
pub use pacer_cache::{CacheConfig, CacheStats, Loader, Lookup, ReadThroughCache};
pub use pacer_ratelimit::{RateController, RateControllerConfig, RateSnapshot};

// Re-export common types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use bytes::Bytes;
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use pacer_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{HttpTransportConfig, HttpTransportConfigBuilder, RaisedStatuses};
    pub use crate::error::{ClientError, ClientResult};
    pub use crate::http_transport::HttpTransport;
    pub use crate::loader::RemoteLoader;
    pub use crate::middleware::{Middleware, MiddlewareChain, Next};
    pub use crate::outcome::{Failure, Outcome};
    pub use crate::request::{NotFoundPolicy, RequestSpec};
    pub use crate::response::RawResponse;
    pub use crate::retry::{BackoffStrategy, RetryConfig};
    pub use crate::runtime::{InvocationRuntime, RuntimeBuilder};
    pub use crate::status::Status;
    pub use crate::transport::{Transport, TransportError};
    pub use http::{HeaderMap, Method, StatusCode};
    pub use pacer_cache::{CacheConfig, Lookup, ReadThroughCache};
    pub use pacer_ratelimit::{RateController, RateControllerConfig};
}
