//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber with an [`EnvFilter`] and either a
//! human readable or a JSON formatting layer. `RUST_LOG` takes precedence over
//! the configured level.

use crate::error::TelemetryError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. `info` or `claimcheck_pipeline=debug`)
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
    /// Include the event target
    pub with_target: bool,
    /// Include thread ids
    pub with_thread_ids: bool,
    /// Include source file and line
    pub with_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
        }
    }
}

impl LoggingConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default level
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Switch JSON output on or off
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Include source locations
    #[must_use]
    pub fn with_file(mut self, with_file: bool) -> Self {
        self.with_file = with_file;
        self
    }
}

/// Build the filter for a configuration
///
/// # Errors
/// Returns error if the configured directive cannot be parsed
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| TelemetryError::Init(format!("invalid log level '{}': {e}", config.level))),
    }
}

/// Install the global subscriber
///
/// # Errors
/// Returns error if the filter is invalid or a subscriber is already installed
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(config.with_target)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_file)
            .with_line_number(config.with_file)
    });
    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_target(config.with_target)
            .with_thread_ids(config.with_thread_ids)
            .with_file(config.with_file)
            .with_line_number(config.with_file)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}
