// Pacer - A resilient client runtime for rate-limited remote services
//
// This library paces calls with an adaptive rate controller, classifies their
// outcomes, waits out transient failures and serves lookups through a
// read-through cache.

// Re-export core functionality
pub use pacer_client::*;

// Re-export component crates
pub use pacer_cache;
pub use pacer_client;
pub use pacer_ratelimit;

#[cfg(feature = "log")]
pub use pacer_log;

// Prelude for common imports
pub mod prelude {
    pub use pacer_client::prelude::*;

    #[cfg(feature = "log")]
    pub use pacer_log::init as init_logging;
}
