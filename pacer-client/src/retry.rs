//! Retry of transient transport failures.

use crate::error::{ClientError, ClientResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default wait between attempts.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Whether transient failures are waited out; when false they are returned at once.
    pub enabled: bool,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Maximum number of attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backoff: BackoffStrategy::Constant(DEFAULT_RETRY_WAIT),
            max_attempts: None,
        }
    }
}

impl RetryConfig {
    /// Return transient failures to the caller without waiting.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Retry forever with a constant wait.
    pub fn fixed(wait: Duration) -> Self {
        Self {
            backoff: BackoffStrategy::Constant(wait),
            ..Default::default()
        }
    }

    /// Retry forever with a linearly growing wait.
    pub fn linear(delay: Duration, max: Duration) -> Self {
        Self {
            backoff: BackoffStrategy::Linear { delay, max },
            ..Default::default()
        }
    }

    /// Retry forever with a doubling wait.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            backoff: BackoffStrategy::Exponential {
                initial,
                max,
                multiplier: 2.0,
            },
            ..Default::default()
        }
    }

    /// Give up after `attempts` attempts in total.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Replace the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Calculate delay after a given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay_for_attempt(attempt)
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant(Duration),
    /// Linear backoff: delay increases by a fixed amount.
    Linear {
        /// Delay increment per attempt.
        delay: Duration,
        /// Maximum delay.
        max: Duration,
    },
    /// Exponential backoff: delay multiplies each attempt.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier (typically 2.0).
        multiplier: f64,
    },
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant(d) => *d,
            Self::Linear { delay, max } => {
                let total = delay.saturating_mul(attempt.saturating_add(1));
                total.min(*max)
            }
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let factor = multiplier.powi(attempt.min(i32::MAX as u32) as i32);
                let millis = initial.as_millis() as f64 * factor;
                if millis.is_finite() && millis < max.as_millis() as f64 {
                    Duration::from_millis(millis as u64)
                } else {
                    *max
                }
            }
        }
    }
}

/// Phase of a retry session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Running the operation
    Attempting,
    /// Sleeping before the next attempt
    Waiting(Duration),
}

/// Re-runs an operation while it fails with a transient error.
///
/// Only [`ClientError::Transient`] is retried. Every other result, errors
/// included, is returned as soon as it is produced. The wait suspends only
/// the calling task.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    config: RetryConfig,
}

impl RetryController {
    /// Create a controller.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` until it stops failing transiently.
    ///
    /// With retry disabled the first transient error is returned unchanged.
    /// When `max_attempts` runs out the last one is wrapped in
    /// [`ClientError::RetryExhausted`].
    pub async fn run<T, F, Fut>(&self, description: &str, mut op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let mut attempt: u32 = 0;
        let mut state = RetryState::Attempting;

        loop {
            match state {
                RetryState::Attempting => {
                    attempt = attempt.saturating_add(1);
                    let error = match op().await {
                        Err(ClientError::Transient(error)) => error,
                        other => return other,
                    };

                    if !self.config.enabled {
                        return Err(ClientError::Transient(error));
                    }

                    if self.config.max_attempts.is_some_and(|max| attempt >= max) {
                        warn!(
                            target_description = description,
                            attempts = attempt,
                            error = %error,
                            "Giving up after transient failures"
                        );
                        return Err(ClientError::RetryExhausted {
                            description: description.to_string(),
                            attempts: attempt,
                            source: error,
                        });
                    }

                    let wait = self.config.delay_for_attempt(attempt - 1);
                    warn!(
                        target_description = description,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "Transient failure, waiting before retry"
                    );
                    state = RetryState::Waiting(wait);
                }
                RetryState::Waiting(wait) => {
                    tokio::time::sleep(wait).await;
                    state = RetryState::Attempting;
                }
            }
        }
    }
}
