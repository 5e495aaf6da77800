//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML/TOML for the schema
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// The file extension is not a supported format
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// An environment override could not be applied
    #[error("invalid value for {var}: {message}")]
    Env {
        /// Environment variable
        var: String,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an environment override error
    pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            message: message.into(),
        }
    }
}
