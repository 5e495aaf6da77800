//! Loading configuration from files and the environment.

use crate::error::ConfigError;
use crate::settings::ClaimcheckConfig;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CLAIMCHECK_";

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML (`.yaml`, `.yml`)
    Yaml,
    /// TOML (`.toml`)
    Toml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    /// Returns error for any other extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl ClaimcheckConfig {
    /// Parse and validate configuration text
    ///
    /// # Errors
    /// Returns error if parsing or validation fails
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Yaml if contents.trim().is_empty() => Self::default(),
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            ConfigFormat::Toml => {
                toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `CLAIMCHECK_*` overrides from the process environment
    ///
    /// # Errors
    /// Returns error if a variable holds an invalid value
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `CLAIMCHECK_*` overrides from a lookup function
    ///
    /// # Errors
    /// Returns error if a variable holds an invalid value or the result
    /// fails validation
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, level)) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some((name, value)) = var("LOG_JSON") {
            self.logging.json = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = var("RUN_LLM_RULES") {
            self.orchestrator.run_llm_rules = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = var("RUN_FORENSICS") {
            self.orchestrator.run_forensics = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = var("GATEWAY_TIMEOUT") {
            self.gateway.timeout = humantime::parse_duration(value.trim())
                .map_err(|e| ConfigError::env(&name, e.to_string()))?;
        }

        self.validate()?;
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::env(name, format!("expected a boolean, got '{other}'"))),
    }
}

/// Load configuration from a file, then apply environment overrides
///
/// # Errors
/// Returns error if the file cannot be read, parsed, or validated
pub async fn load_config(path: impl AsRef<Path>) -> Result<ClaimcheckConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut config = ClaimcheckConfig::parse(&contents, format)?;
    config.apply_env_overrides()?;

    debug!(path = %path.display(), ?format, "Configuration loaded");
    Ok(config)
}
