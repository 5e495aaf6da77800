//! # Claimcheck Config
//!
//! Configuration management for the claimcheck validation engine.
//!
//! Configuration is read from a YAML or TOML file (chosen by extension),
//! overridden by `CLAIMCHECK_*` environment variables and validated before
//! use.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod settings;

pub use error::ConfigError;
pub use loader::{load_config, ConfigFormat, ENV_PREFIX};
pub use settings::{
    AuditSettings, ClaimcheckConfig, GatewaySettings, LoggingSettings, MetricsSettings,
    OrchestratorSettings, RiskSettings,
};
