//! Pacer Logging
//!
//! Installs a `tracing` subscriber for the pacer crates, configured from the
//! environment. Library code never calls this; applications and tests do.
//!
//! # Usage
//!
//! ```rust
//! pacer_log::init();
//!
//! tracing::info!(rate = 25.0, "throttle adjusted");
//! ```
//!
//! # Environment Variables
//!
//! - `PACER_DEBUG=1` - Enable debug logging
//! - `PACER_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `PACER_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `PACER_LOG_TARGET=true|false` - Include the event target (default: true)
//! - `RUST_LOG` - Overrides the level with a full `EnvFilter` directive

use once_cell::sync::Lazy;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for pacer logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Parse a level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// The directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// The filter directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// Another global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether to include the event target
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            target: true,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env::var("PACER_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = env::var("PACER_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("PACER_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let target = env::var("PACER_LOG_TARGET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Self {
            debug,
            level,
            format,
            target,
        }
    }

    /// Build the filter, preferring `RUST_LOG` when it is set.
    pub fn filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(self.level.as_directive())
                .map_err(|e| LogError::Filter(e.to_string())),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Get the configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Whether a subscriber was installed by this crate.
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::SeqCst)
}

/// Install the global subscriber using the environment configuration.
///
/// Calling this more than once is harmless; only the first call installs.
/// Failures (for instance a subscriber installed by someone else) are
/// swallowed, use [`try_init_with`] to observe them.
pub fn init() {
    let _ = try_init_with(config());
}

/// Install the global subscriber with an explicit configuration.
pub fn try_init_with(config: &LogConfig) -> Result<(), LogError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = config.filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.target)
        .with_writer(std::io::stderr);

    let result = match config.format {
        Format::Pretty => builder.pretty().try_init(),
        Format::Compact => builder.compact().try_init(),
        Format::Json => builder.json().try_init(),
    };

    result.map_err(|e| {
        INSTALLED.store(false, Ordering::SeqCst);
        LogError::Install(e.to_string())
    })
}

// ============================================================================
// Tests
// ============================================================================
