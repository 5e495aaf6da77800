//! Prometheus metrics.
//!
//! [`Metrics`] owns its own [`Registry`]; nothing is registered in the
//! process-wide default registry, so several engines can coexist in one
//! process (and in tests).

use crate::error::TelemetryError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Prefix of every metric name
    pub namespace: String,
    /// Buckets of the validation duration histogram, in seconds
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "claimcheck".to_string(),
            duration_buckets: vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        }
    }
}

impl MetricsConfig {
    /// Set the namespace
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Engine metrics
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    validations_total: IntCounterVec,
    rule_outcomes_total: IntCounterVec,
    validation_duration_seconds: Histogram,
    risk_score: Histogram,
    gateway_calls_total: IntCounterVec,
    gateway_fallbacks_total: IntCounterVec,
}

impl Metrics {
    /// Create and register all metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new(config: &MetricsConfig) -> Result<Self, TelemetryError> {
        let registry = Registry::new_custom(Some(config.namespace.clone()), None)?;

        let validations_total = IntCounterVec::new(
            Opts::new("validations_total", "Completed validation runs by decision"),
            &["decision"],
        )?;
        let rule_outcomes_total = IntCounterVec::new(
            Opts::new("rule_outcomes_total", "Rule outcomes by status"),
            &["status"],
        )?;
        let validation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "validation_duration_seconds",
                "Wall-clock duration of a validation run",
            )
            .buckets(config.duration_buckets.clone()),
        )?;
        let risk_score = Histogram::with_opts(
            HistogramOpts::new("risk_score", "Risk score of completed validation runs")
                .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        let gateway_calls_total = IntCounterVec::new(
            Opts::new("gateway_calls_total", "Provider attempts by provider and outcome"),
            &["provider", "outcome"],
        )?;
        let gateway_fallbacks_total = IntCounterVec::new(
            Opts::new("gateway_fallbacks_total", "Requests served by a fallback provider"),
            &["primary", "fallback"],
        )?;

        registry.register(Box::new(validations_total.clone()))?;
        registry.register(Box::new(rule_outcomes_total.clone()))?;
        registry.register(Box::new(validation_duration_seconds.clone()))?;
        registry.register(Box::new(risk_score.clone()))?;
        registry.register(Box::new(gateway_calls_total.clone()))?;
        registry.register(Box::new(gateway_fallbacks_total.clone()))?;

        Ok(Self {
            registry,
            validations_total,
            rule_outcomes_total,
            validation_duration_seconds,
            risk_score,
            gateway_calls_total,
            gateway_fallbacks_total,
        })
    }

    /// Record a completed validation run
    pub fn record_validation(&self, decision: &str, duration: Duration, risk_score: f64) {
        self.validations_total.with_label_values(&[decision]).inc();
        self.validation_duration_seconds
            .observe(duration.as_secs_f64());
        self.risk_score.observe(risk_score);
    }

    /// Record one rule outcome
    pub fn record_rule(&self, status: &str) {
        self.rule_outcomes_total.with_label_values(&[status]).inc();
    }

    /// Record one provider attempt
    pub fn record_gateway_call(&self, provider: &str, outcome: &str) {
        self.gateway_calls_total
            .with_label_values(&[provider, outcome])
            .inc();
    }

    /// Record a request served by the fallback
    pub fn record_fallback(&self, primary: &str, fallback: &str) {
        self.gateway_fallbacks_total
            .with_label_values(&[primary, fallback])
            .inc();
    }

    /// The underlying registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}
