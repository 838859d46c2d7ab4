//! Adaptive rate controller
//!
//! The controller paces outbound calls at a rate that moves between a floor
//! and a ceiling. Callers report how the server treated them: sustained
//! success doubles the rate, signs of server-side throttling halve it.
//!
//! ## How It Works
//!
//! 1. The controller starts at `base_rate`
//! 2. Each call reserves a slot `1 / current_rate` seconds after the previous one
//! 3. The caller sleeps until its slot (no lock is held while sleeping)
//! 4. `increase()` doubles and `decrease()` halves the rate, clamped to bounds
//!
//! ## Example
//!
//! ```rust
//! use pacer_ratelimit::{RateController, RateControllerConfig};
//!
//! let controller = RateController::new(RateControllerConfig::new(100.0, 0.01)).unwrap();
//!
//! controller.decrease();
//! controller.decrease();
//! assert_eq!(controller.current_rate(), 25.0);
//!
//! controller.increase();
//! assert_eq!(controller.current_rate(), 50.0);
//! ```

use crate::config::RateControllerConfig;
use crate::error::{RateLimitError, RateLimitResult};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Longest wait between two permits. Rates slower than one permit per
/// interval are paced at this interval.
pub const MAX_PERMIT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Spacing between permits at `rate` permits per second.
fn permit_interval(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate)
        .map_or(MAX_PERMIT_INTERVAL, |interval| interval.min(MAX_PERMIT_INTERVAL))
}

/// The mutable rate triple. Always satisfies `min_rate <= current_rate <= base_rate`.
#[derive(Debug, Clone, Copy)]
struct RateState {
    current_rate: f64,
    base_rate: f64,
    min_rate: f64,
}

impl RateState {
    fn clamp(&self, rate: f64) -> f64 {
        rate.clamp(self.min_rate, self.base_rate)
    }
}

/// Point-in-time view of a controller, for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSnapshot {
    /// Permits per second currently allowed
    pub current_rate: f64,
    /// Configured ceiling
    pub base_rate: f64,
    /// Configured floor
    pub min_rate: f64,
    /// Permits handed out so far
    pub permits_granted: u64,
    /// Number of `increase()` calls
    pub increases: u64,
    /// Number of `decrease()` calls
    pub decreases: u64,
}

/// AIMD-style rate controller shared by all callers of one remote service.
#[derive(Debug)]
pub struct RateController {
    state: RwLock<RateState>,
    /// Slot of the most recently granted permit
    last_slot: Mutex<Option<Instant>>,
    permits_granted: AtomicU64,
    increases: AtomicU64,
    decreases: AtomicU64,
}

impl RateController {
    /// Create a controller starting at the configured ceiling.
    pub fn new(config: RateControllerConfig) -> RateLimitResult<Self> {
        config.validate()?;

        debug!(
            base_rate = config.base_rate,
            min_rate = config.min_rate,
            "Creating rate controller"
        );

        Ok(Self::from_valid(config))
    }

    fn from_valid(config: RateControllerConfig) -> Self {
        Self {
            state: RwLock::new(RateState {
                current_rate: config.base_rate,
                base_rate: config.base_rate,
                min_rate: config.min_rate,
            }),
            last_slot: Mutex::new(None),
            permits_granted: AtomicU64::new(0),
            increases: AtomicU64::new(0),
            decreases: AtomicU64::new(0),
        }
    }

    /// Wait until a permit at the current rate is available.
    ///
    /// Never fails. The first permit is granted immediately.
    pub async fn acquire(&self) {
        let now = Instant::now();
        let slot = self.reserve(now);

        if slot > now {
            trace!(
                wait_ms = (slot - now).as_millis() as u64,
                "Waiting for rate permit"
            );
            tokio::time::sleep_until(slot).await;
        }

        self.permits_granted.fetch_add(1, Ordering::Relaxed);
    }

    /// Claim the next free slot and return it. The lock is released before
    /// the caller sleeps.
    fn reserve(&self, now: Instant) -> Instant {
        let interval = permit_interval(self.current_rate());
        let mut last = self.last_slot.lock();

        let slot = match *last {
            Some(previous) => previous.checked_add(interval).unwrap_or(previous).max(now),
            None => now,
        };
        *last = Some(slot);
        slot
    }

    /// Double the rate, up to the ceiling.
    pub fn increase(&self) {
        self.increases.fetch_add(1, Ordering::Relaxed);
        self.adjust("increase", |state| state.current_rate * 2.0);
    }

    /// Halve the rate, down to the floor.
    pub fn decrease(&self) {
        self.decreases.fetch_add(1, Ordering::Relaxed);
        self.adjust("decrease", |state| state.current_rate / 2.0);
    }

    fn adjust(&self, direction: &'static str, next: impl FnOnce(&RateState) -> f64) {
        let (from, to) = {
            let mut state = self.state.write();
            let from = state.current_rate;
            state.current_rate = state.clamp(next(&state));
            (from, state.current_rate)
        };

        if from != to {
            debug!(direction, from, to, "Rate adjusted");
        }
    }

    /// Move the ceiling, keeping the current throttle factor.
    ///
    /// A controller running at a quarter of its old ceiling runs at a quarter
    /// of the new one (clamped to the floor).
    pub fn set_base_rate(&self, base_rate: f64) -> RateLimitResult<()> {
        let base_rate = RateLimitError::check_rate("base_rate", base_rate)?;

        let mut state = self.state.write();
        RateLimitError::check_bounds(state.min_rate, base_rate)?;

        let factor = state.current_rate / state.base_rate;
        state.base_rate = base_rate;
        state.current_rate = state.clamp(factor * base_rate);

        debug!(
            base_rate,
            current_rate = state.current_rate,
            "Rate ceiling changed"
        );
        Ok(())
    }

    /// Move the floor. The current rate is clamped into the new range.
    pub fn set_min_rate(&self, min_rate: f64) -> RateLimitResult<()> {
        let min_rate = RateLimitError::check_rate("min_rate", min_rate)?;

        let mut state = self.state.write();
        RateLimitError::check_bounds(min_rate, state.base_rate)?;

        state.min_rate = min_rate;
        state.current_rate = state.clamp(state.current_rate);

        debug!(
            min_rate,
            current_rate = state.current_rate,
            "Rate floor changed"
        );
        Ok(())
    }

    /// Return to the ceiling.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.current_rate = state.base_rate;
    }

    /// Permits per second currently allowed.
    pub fn current_rate(&self) -> f64 {
        self.state.read().current_rate
    }

    /// Configured ceiling.
    pub fn base_rate(&self) -> f64 {
        self.state.read().base_rate
    }

    /// Configured floor.
    pub fn min_rate(&self) -> f64 {
        self.state.read().min_rate
    }

    /// Read everything at once.
    pub fn snapshot(&self) -> RateSnapshot {
        let state = *self.state.read();
        RateSnapshot {
            current_rate: state.current_rate,
            base_rate: state.base_rate,
            min_rate: state.min_rate,
            permits_granted: self.permits_granted.load(Ordering::Relaxed),
            increases: self.increases.load(Ordering::Relaxed),
            decreases: self.decreases.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::from_valid(RateControllerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn controller(base: f64, min: f64) -> RateController {
        RateController::new(RateControllerConfig::new(base, min)).unwrap()
    }

    #[test]
    fn test_starts_at_base_rate() {
        let c = controller(100.0, 0.01);
        assert_eq!(c.current_rate(), 100.0);
        assert_eq!(c.base_rate(), 100.0);
        assert_eq!(c.min_rate(), 0.01);
    }

    #[test]
    fn test_permit_interval_saturates() {
        assert_eq!(permit_interval(4.0), Duration::from_millis(250));
        assert_eq!(permit_interval(1e-25), MAX_PERMIT_INTERVAL);
        assert_eq!(permit_interval(f64::MIN_POSITIVE), MAX_PERMIT_INTERVAL);
        assert_eq!(permit_interval(5e-324), MAX_PERMIT_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_at_tiny_rate_waits_max_interval() {
        let c = controller(1.0, 1e-25);
        for _ in 0..200 {
            c.decrease();
        }
        assert_eq!(c.current_rate(), 1e-25);

        c.acquire().await;
        let start = Instant::now();
        c.acquire().await;
        let waited = start.elapsed();

        assert!(waited >= MAX_PERMIT_INTERVAL);
        assert!(waited < MAX_PERMIT_INTERVAL + Duration::from_secs(1));
        assert_eq!(c.snapshot().permits_granted, 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(RateController::new(RateControllerConfig::new(1.0, 5.0)).is_err());
        assert!(RateController::new(RateControllerConfig::new(-1.0, 0.01)).is_err());
    }

    #[test]
    fn test_failure_then_success_scenario() {
        let c = controller(100.0, 0.01);

        c.decrease();
        assert_eq!(c.current_rate(), 50.0);
        c.decrease();
        assert_eq!(c.current_rate(), 25.0);
        c.decrease();
        assert_eq!(c.current_rate(), 12.5);

        c.increase();
        assert_eq!(c.current_rate(), 25.0);
    }

    #[test]
    fn test_convergence_to_floor() {
        let c = controller(100.0, 0.01);

        for n in 1..=20 {
            c.decrease();
            let expected = (100.0 / 2f64.powi(n)).max(0.01);
            assert_eq!(c.current_rate(), expected);
        }

        // Idempotent at the floor
        c.decrease();
        assert_eq!(c.current_rate(), 0.01);

        c.increase();
        assert_eq!(c.current_rate(), 0.02);
    }

    #[test]
    fn test_increase_idempotent_at_ceiling() {
        let c = controller(100.0, 0.01);
        c.increase();
        c.increase();
        assert_eq!(c.current_rate(), 100.0);

        c.decrease();
        c.decrease();
        c.decrease();
        c.increase();
        c.increase();
        c.increase();
        c.increase();
        assert_eq!(c.current_rate(), 100.0);
    }

    #[test]
    fn test_set_base_rate_keeps_throttle_factor() {
        let c = controller(100.0, 0.01);
        c.decrease();
        c.decrease();
        assert_eq!(c.current_rate(), 25.0);

        c.set_base_rate(40.0).unwrap();
        assert_eq!(c.base_rate(), 40.0);
        assert_eq!(c.current_rate(), 10.0);
    }

    #[test]
    fn test_set_base_rate_below_floor_is_rejected() {
        let c = controller(100.0, 5.0);
        assert!(c.set_base_rate(1.0).is_err());
        assert!(c.set_base_rate(0.0).is_err());
        assert_eq!(c.base_rate(), 100.0);
        assert_eq!(c.current_rate(), 100.0);
    }

    #[test]
    fn test_set_min_rate_clamps_current() {
        let c = controller(100.0, 0.01);
        for _ in 0..10 {
            c.decrease();
        }
        assert!(c.current_rate() < 1.0);

        c.set_min_rate(1.0).unwrap();
        assert_eq!(c.current_rate(), 1.0);
        assert!(c.set_min_rate(200.0).is_err());
    }

    #[test]
    fn test_reset_and_snapshot() {
        let c = controller(8.0, 1.0);
        c.decrease();
        c.decrease();
        c.increase();

        let snapshot = c.snapshot();
        assert_eq!(snapshot.current_rate, 4.0);
        assert_eq!(snapshot.decreases, 2);
        assert_eq!(snapshot.increases, 1);

        c.reset();
        assert_eq!(c.current_rate(), 8.0);
    }

    #[test]
    fn test_concurrent_feedback_never_tears() {
        let c = Arc::new(controller(64.0, 1.0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for j in 0..1000 {
                        if (i + j) % 3 == 0 {
                            c.increase();
                        } else {
                            c.decrease();
                        }
                        let rate = c.current_rate();
                        assert!((1.0..=64.0).contains(&rate));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_permit_is_immediate() {
        let c = controller(1.0, 0.01);
        let start = Instant::now();
        c.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(c.snapshot().permits_granted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_paces_permits() {
        let c = controller(2.0, 0.01);
        let start = Instant::now();

        for _ in 0..3 {
            c.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrease_slows_pacing() {
        let c = controller(10.0, 0.01);
        c.acquire().await;
        c.decrease();

        let start = Instant::now();
        c.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquire_shares_the_rate() {
        let c = Arc::new(controller(10.0, 0.01));
        let start = Instant::now();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let c = c.clone();
                tokio::spawn(async move { c.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(900));
        assert_eq!(c.snapshot().permits_granted, 10);
    }

    proptest! {
        #[test]
        fn prop_rate_stays_within_bounds(
            ops in proptest::collection::vec(any::<bool>(), 0..200),
            base in 1.0f64..10_000.0,
            min_fraction in 0.0001f64..1.0,
        ) {
            let min = base * min_fraction;
            let c = controller(base, min);

            for increase in ops {
                if increase {
                    c.increase();
                } else {
                    c.decrease();
                }
                let rate = c.current_rate();
                prop_assert!(rate >= min && rate <= base);
            }
        }
    }
}
