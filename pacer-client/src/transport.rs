//! Transport seam.

use crate::outcome::Cause;
use crate::request::RequestSpec;
use crate::response::RawResponse;
use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by a transport instead of a response.
///
/// `ServiceUnavailable`, `InternalServerError` and `ConnectionReset` are
/// transient: they never become an outcome and are retried.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Server reported 503
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Server reported 500
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// Connection refused or reset
    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// Exchange cut short before a full response arrived
    #[error("Aborted: {0}")]
    Aborted(String),

    /// Target does not exist at the transport level
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other I/O failure, timeouts included
    #[error("I/O error: {message}")]
    Io {
        /// Description of the failure
        message: String,
        /// Underlying error
        #[source]
        source: Cause,
    },

    /// The request could not be built or sent
    #[error("Request error: {message}")]
    Request {
        /// Description of the failure
        message: String,
        /// Underlying error
        #[source]
        source: Cause,
    },
}

impl TransportError {
    /// Check if this error should be retried rather than classified.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_) | Self::InternalServerError(_) | Self::ConnectionReset(_)
        )
    }

    /// I/O failure wrapping `source`.
    pub fn io<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Io {
            message: source.to_string(),
            source: Arc::new(source),
        }
    }

    /// Request failure wrapping `source`.
    pub fn request<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Request {
            message: source.to_string(),
            source: Arc::new(source),
        }
    }
}

/// Executes a [`RequestSpec`] against the remote service.
///
/// Implementations must be safe to call concurrently and repeatedly with the
/// same request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange.
    async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        (**self).execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(TransportError::ServiceUnavailable("503".into()).is_transient());
        assert!(TransportError::InternalServerError("500".into()).is_transient());
        assert!(TransportError::ConnectionReset("reset".into()).is_transient());
        assert!(!TransportError::Aborted("eof".into()).is_transient());
        assert!(!TransportError::NotFound("gone".into()).is_transient());
        assert!(!TransportError::io(std::io::Error::other("timeout")).is_transient());
    }

    #[test]
    fn test_source_is_kept() {
        let err = TransportError::request(std::io::Error::other("bad scheme"));
        assert_eq!(err.to_string(), "Request error: bad scheme");
        assert!(err.source().is_some());
    }
}
