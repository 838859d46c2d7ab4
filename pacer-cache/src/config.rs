//! Cache configuration types.

use crate::error::{CacheError, CacheResult};
use std::time::Duration;

/// Default lifetime of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default number of keys held before least-recently-used eviction.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Read-through cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time after insertion at which an entry stops being served
    pub ttl: Duration,

    /// Maximum number of keys kept
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with default TTL and size.
    ///
    /// # Examples
    ///
    /// ```
    /// use pacer_cache::CacheConfig;
    /// use std::time::Duration;
    ///
    /// let config = CacheConfig::new()
    ///     .with_ttl(Duration::from_secs(60))
    ///     .with_max_size(500);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the entry lifetime in seconds.
    pub fn with_ttl_secs(self, secs: u64) -> Self {
        self.with_ttl(Duration::from_secs(secs))
    }

    /// Set the maximum number of keys.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_size == 0 {
            return Err(CacheError::Config(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::Config("ttl must be greater than 0".to_string()));
        }
        Ok(())
    }
}
