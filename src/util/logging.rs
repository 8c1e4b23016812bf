//! Structured logging setup for cogpack
//!
//! Initialization and configuration for structured logging using the
//! `tracing` ecosystem. Supports console and JSON output, filtering via
//! `RUST_LOG`, and a `COGPACK_LOG_LEVEL` fallback for the crate's own spans.
//!
//! # Example
//!
//! ```no_run
//! use cogpack::util::logging;
//!
//! // Initialize with default configuration
//! logging::init_default();
//!
//! // Or initialize from environment variables
//! logging::init_from_env();
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format (for structured logging in production)
    pub use_json: bool,

    /// Include the module target (e.g., cogpack::dockerfile) in logs
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a logging configuration with the specified level
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, falling back to INFO for unknown input.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Initializes the logging system with the provided configuration
///
/// Sets up the `tracing` subscriber. Can only be called once; subsequent
/// calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("cogpack={}", config.level).parse().unwrap());
        }

        let builder = fmt::layer()
            .with_target(config.include_target)
            .with_writer(std::io::stderr);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(builder.json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(builder)
                .init();
        }
    });
}

/// Initializes logging from environment variables
///
/// Reads `COGPACK_LOG_LEVEL` (trace|debug|info|warn|error, default info) and
/// `COGPACK_LOG_JSON` (true|false, default false). `RUST_LOG`, when set,
/// takes precedence over the level.
pub fn init_from_env() {
    let level = env::var("COGPACK_LOG_LEVEL")
        .map(|s| parse_level(&s))
        .unwrap_or(Level::INFO);

    let use_json = env::var("COGPACK_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..Default::default()
    });
}

/// Initializes logging with default settings (INFO, console output)
pub fn init_default() {
    init_logging(LoggingConfig::default());
}
