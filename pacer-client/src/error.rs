//! Client error types.

use crate::transport::TransportError;
use pacer_cache::CacheError;
use pacer_ratelimit::RateLimitError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Client errors.
///
/// Remote failures that have a status are returned as
/// [`Outcome`](crate::Outcome)s; only transient failures that survived the
/// retry policy and local defects end up here.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transient failure returned with retry disabled.
    #[error("Transient failure: {0}")]
    Transient(TransportError),

    /// Bounded retry gave up.
    #[error("{description} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Target of the call
        description: String,
        /// Number of attempts made
        attempts: u32,
        /// Last transient failure
        #[source]
        source: TransportError,
    },

    /// A success body could not be decoded.
    #[error("Failed to decode response from {description}: {message}")]
    Decode {
        /// Target of the call
        description: String,
        /// Decoder error
        message: String,
    },

    /// Request building error.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate controller configuration error.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// Cache configuration error.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ClientError {
    /// The transient failure behind this error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transient(err) | Self::RetryExhausted { source: err, .. } => Some(err),
            _ => None,
        }
    }

    /// Check if this error came from a transient remote failure.
    pub fn is_transient(&self) -> bool {
        self.transport_error().is_some()
    }
}
