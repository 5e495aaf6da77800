//! Configuration schema.
//!
//! Every section has serde defaults, so an empty file is a valid
//! configuration. Durations use humantime notation (`30s`, `1m`, `250ms`).

use claimcheck_resilience::GatewayConfig;
use claimcheck_telemetry::{AuditConfig, LoggingConfig, MetricsConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ClaimcheckConfig {
    /// Logging configuration
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingSettings,

    /// Resilience knobs applied to every provider gateway
    #[serde(default)]
    #[validate(nested)]
    pub gateway: GatewaySettings,

    /// Orchestrator configuration
    #[serde(default)]
    #[validate(nested)]
    pub orchestrator: OrchestratorSettings,

    /// Risk scoring configuration
    #[serde(default)]
    #[validate(nested)]
    pub risk: RiskSettings,

    /// Audit trail configuration
    #[serde(default)]
    #[validate(nested)]
    pub audit: AuditSettings,

    /// Metrics configuration
    #[serde(default)]
    #[validate(nested)]
    pub metrics: MetricsSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingSettings {
    /// Default filter directive
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1, max = 512))]
    pub level: String,

    /// Emit JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Logging configuration for the telemetry crate
    #[must_use]
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig::new()
            .with_level(self.level.clone())
            .with_json(self.json)
    }
}

/// Resilience knobs of a provider gateway
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewaySettings {
    /// Try the fallback provider when the primary fails
    #[serde(default = "default_true")]
    pub fallback_on_error: bool,

    /// Budget of a single provider call
    #[serde(default = "default_timeout", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub timeout: Duration,

    /// Retries after the first attempt, rate limiting only
    #[serde(default = "default_retry_attempts")]
    #[validate(range(max = 10))]
    pub retry_attempts: u32,

    /// Base delay of the exponential backoff
    #[serde(default = "default_retry_base_delay", with = "humantime_serde")]
    pub retry_base_delay: Duration,

    /// Cap on a single backoff sleep
    #[serde(default = "default_retry_max_delay", with = "humantime_serde")]
    pub retry_max_delay: Duration,

    /// Consecutive failures before a circuit opens
    #[serde(default = "default_circuit_breaker_threshold")]
    #[validate(range(min = 1, max = 1000))]
    pub circuit_breaker_threshold: u32,

    /// How long an open circuit blocks calls
    #[serde(default = "default_circuit_breaker_cooldown", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub circuit_breaker_cooldown: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            fallback_on_error: true,
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay: default_retry_base_delay(),
            retry_max_delay: default_retry_max_delay(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_cooldown: default_circuit_breaker_cooldown(),
        }
    }
}

impl GatewaySettings {
    /// Gateway configuration for a primary and optional fallback provider
    #[must_use]
    pub fn gateway_config(&self, primary_id: &str, fallback_id: Option<&str>) -> GatewayConfig {
        let config = GatewayConfig::new(primary_id)
            .with_fallback_on_error(self.fallback_on_error)
            .with_timeout(self.timeout)
            .with_retry(self.retry_attempts, self.retry_base_delay)
            .with_retry_max_delay(self.retry_max_delay)
            .with_circuit_breaker(self.circuit_breaker_threshold, self.circuit_breaker_cooldown);

        match fallback_id {
            Some(id) => config.with_fallback(id),
            None => config,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrchestratorSettings {
    /// Process-wide switch for language-model rules
    #[serde(default = "default_true")]
    pub run_llm_rules: bool,

    /// Process-wide switch for forensic rules
    #[serde(default = "default_true")]
    pub run_forensics: bool,

    /// Budget of a single rule executor
    #[serde(default, with = "humantime_serde")]
    pub rule_timeout: Option<Duration>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            run_llm_rules: true,
            run_forensics: true,
            rule_timeout: None,
        }
    }
}

/// Risk scoring configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RiskSettings {
    /// Per-rule severity weight overrides
    #[serde(default)]
    #[validate(custom(function = "unit_weights"))]
    pub weights: BTreeMap<String, f64>,
}

/// Audit trail configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuditSettings {
    /// Whether audit logging is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capacity of the event channel
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub channel_capacity: usize,

    /// Events per sink write
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 10_000))]
    pub batch_size: usize,

    /// Maximum time an event waits before being flushed
    #[serde(default = "default_flush_interval", with = "humantime_serde")]
    #[validate(custom(function = "non_zero_duration"))]
    pub flush_interval: Duration,

    /// Redact sensitive metadata
    #[serde(default = "default_true")]
    pub redact_sensitive: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
            batch_size: default_batch_size(),
            flush_interval: default_flush_interval(),
            redact_sensitive: true,
        }
    }
}

impl AuditSettings {
    /// Audit configuration for the telemetry crate
    #[must_use]
    pub fn to_audit_config(&self) -> AuditConfig {
        AuditConfig {
            enabled: self.enabled,
            channel_capacity: self.channel_capacity,
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            redact_sensitive: self.redact_sensitive,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MetricsSettings {
    /// Prefix of every metric name
    #[serde(default = "default_namespace")]
    #[validate(length(min = 1, max = 64), custom(function = "metric_namespace"))]
    pub namespace: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl MetricsSettings {
    /// Metrics configuration for the telemetry crate
    #[must_use]
    pub fn to_metrics_config(&self) -> MetricsConfig {
        MetricsConfig::default().with_namespace(self.namespace.clone())
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_circuit_breaker_threshold() -> u32 {
    5
}

fn default_circuit_breaker_cooldown() -> Duration {
    Duration::from_secs(60)
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_batch_size() -> usize {
    64
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_namespace() -> String {
    "claimcheck".to_string()
}

fn non_zero_duration(duration: &Duration) -> Result<(), ValidationError> {
    if duration.is_zero() {
        return Err(ValidationError::new("non_zero_duration"));
    }
    Ok(())
}

fn unit_weights(weights: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
    for (rule_id, weight) in weights {
        if !(0.0..=1.0).contains(weight) {
            let mut error = ValidationError::new("weight_range");
            error.add_param("rule_id".into(), rule_id);
            error.add_param("value".into(), weight);
            return Err(error);
        }
    }
    Ok(())
}

fn metric_namespace(namespace: &str) -> Result<(), ValidationError> {
    let mut chars = namespace.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::new("metric_namespace"))
    }
}
