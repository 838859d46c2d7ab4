//! Rate controller configuration

use crate::error::{RateLimitError, RateLimitResult};
use serde::{Deserialize, Serialize};

/// Default ceiling: high enough to be effectively unthrottled.
pub const DEFAULT_BASE_RATE: f64 = 1000.0;

/// Default floor: small but nonzero so calls keep trickling through.
pub const DEFAULT_MIN_RATE: f64 = 0.01;

/// Configuration for a [`RateController`](crate::RateController)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateControllerConfig {
    /// Ceiling in permits per second; the controller starts here
    pub base_rate: f64,
    /// Floor in permits per second
    pub min_rate: f64,
}

impl Default for RateControllerConfig {
    fn default() -> Self {
        Self {
            base_rate: DEFAULT_BASE_RATE,
            min_rate: DEFAULT_MIN_RATE,
        }
    }
}

impl RateControllerConfig {
    /// Create a configuration with explicit bounds.
    pub fn new(base_rate: f64, min_rate: f64) -> Self {
        Self {
            base_rate,
            min_rate,
        }
    }

    /// Set the ceiling.
    pub fn with_base_rate(mut self, base_rate: f64) -> Self {
        self.base_rate = base_rate;
        self
    }

    /// Set the floor.
    pub fn with_min_rate(mut self, min_rate: f64) -> Self {
        self.min_rate = min_rate;
        self
    }

    /// Check both rates and their ordering.
    pub fn validate(&self) -> RateLimitResult<()> {
        RateLimitError::check_rate("base_rate", self.base_rate)?;
        RateLimitError::check_rate("min_rate", self.min_rate)?;
        RateLimitError::check_bounds(self.min_rate, self.base_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateControllerConfig::default();
        assert_eq!(config.base_rate, 1000.0);
        assert_eq!(config.min_rate, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RateControllerConfig::default()
            .with_base_rate(100.0)
            .with_min_rate(0.5);

        assert_eq!(config, RateControllerConfig::new(100.0, 0.5));
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        assert!(RateControllerConfig::new(0.0, 0.01).validate().is_err());
        assert!(RateControllerConfig::new(10.0, 0.0).validate().is_err());
        assert!(RateControllerConfig::new(1.0, 2.0).validate().is_err());
        assert!(RateControllerConfig::new(f64::INFINITY, 1.0).validate().is_err());
    }
}
