//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
///
/// Loader failures are not errors of the cache; they travel inside
/// [`Lookup::Error`](crate::Lookup::Error).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
