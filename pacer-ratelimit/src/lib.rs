//! # Pacer Rate Control
//!
//! Client-side pacing for a remote service that enforces its own rate limit.
//!
//! ## Features
//!
//! - **Permit pacing**: `acquire()` spaces calls `1 / current_rate` seconds apart
//! - **AIMD feedback**: `increase()` doubles, `decrease()` halves the rate
//! - **Hard bounds**: the rate never leaves `[min_rate, base_rate]`
//! - **Live reconfiguration**: moving the ceiling keeps the throttle factor
//! - **Monitoring**: `snapshot()` exposes the rate and feedback counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pacer_ratelimit::{RateController, RateControllerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = RateController::new(RateControllerConfig::new(50.0, 0.1))?;
//!
//! controller.acquire().await;
//! // ... perform the remote call ...
//! controller.increase();
//!
//! println!("now allowed: {} calls/sec", controller.current_rate());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;

pub use config::{DEFAULT_BASE_RATE, DEFAULT_MIN_RATE, RateControllerConfig};
pub use controller::{MAX_PERMIT_INTERVAL, RateController, RateSnapshot};
pub use error::{RateLimitError, RateLimitResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RateControllerConfig;
    pub use crate::controller::{RateController, RateSnapshot};
    pub use crate::error::{RateLimitError, RateLimitResult};
}
