//! Error types for rate control

use thiserror::Error;

/// Result type for rate control operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Rate control errors
///
/// The controller itself never fails at runtime; these only come out of
/// construction and reconfiguration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    /// A rate was zero, negative, NaN or infinite
    #[error("Invalid rate {value} for {name}: must be finite and greater than 0")]
    InvalidRate {
        /// Which setting was rejected
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// The floor would sit above the ceiling
    #[error("Rate configuration error: min rate {min_rate} exceeds base rate {base_rate}")]
    InvertedBounds {
        /// Requested floor
        min_rate: f64,
        /// Requested ceiling
        base_rate: f64,
    },
}

impl RateLimitError {
    /// Reject `value` unless it is a usable rate.
    pub(crate) fn check_rate(name: &'static str, value: f64) -> RateLimitResult<f64> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self::InvalidRate { name, value })
        }
    }

    /// Reject bounds where the floor is above the ceiling.
    pub(crate) fn check_bounds(min_rate: f64, base_rate: f64) -> RateLimitResult<()> {
        if min_rate <= base_rate {
            Ok(())
        } else {
            Err(Self::InvertedBounds {
                min_rate,
                base_rate,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rate() {
        assert_eq!(RateLimitError::check_rate("base_rate", 5.0), Ok(5.0));
        assert!(RateLimitError::check_rate("base_rate", 0.0).is_err());
        assert!(RateLimitError::check_rate("base_rate", -1.0).is_err());
        assert!(RateLimitError::check_rate("base_rate", f64::NAN).is_err());
        assert!(RateLimitError::check_rate("base_rate", f64::INFINITY).is_err());
    }

    #[test]
    fn test_check_bounds() {
        assert!(RateLimitError::check_bounds(1.0, 1.0).is_ok());
        let err = RateLimitError::check_bounds(10.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("exceeds base rate"));
    }
}
