//! Per-provider health tracking and circuit breaking.
//!
//! Each provider behind a gateway owns one [`ProviderHealth`]. Consecutive
//! failures move it from healthy to degraded (at half the threshold) and to
//! unhealthy with an open circuit (at the threshold). Any success resets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Reason recorded when a call is skipped because the circuit is open
pub const CIRCUIT_OPEN_REASON: &str = "circuit open";

/// Smoothing factor of the latency moving average
const LATENCY_EMA_ALPHA: f64 = 0.1;

/// Provider health states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    /// Provider is serving normally
    Healthy,
    /// Provider is failing but still receives traffic
    Degraded,
    /// Provider failed repeatedly; its circuit may be open
    Unhealthy,
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Mutable health state of one provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    provider_id: String,
    config: CircuitBreakerConfig,
    status: ProviderStatus,
    consecutive_failures: u32,
    request_count: u64,
    error_count: u64,
    avg_latency_ms: Option<f64>,
    circuit_open_until: Option<Instant>,
    last_error: Option<String>,
    updated_at: DateTime<Utc>,
}

impl ProviderHealth {
    /// Create a healthy record
    #[must_use]
    pub fn new(provider_id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider_id: provider_id.into(),
            config,
            status: ProviderStatus::Healthy,
            consecutive_failures: 0,
            request_count: 0,
            error_count: 0,
            avg_latency_ms: None,
            circuit_open_until: None,
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(provider_id: impl Into<String>) -> Self {
        Self::new(provider_id, CircuitBreakerConfig::default())
    }

    /// Get the provider ID
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ProviderStatus {
        self.status
    }

    /// Failures since the last success
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Total recorded calls
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Total recorded failures
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Moving average of successful call latency
    #[must_use]
    pub fn avg_latency_ms(&self) -> Option<f64> {
        self.avg_latency_ms
    }

    /// Last recorded failure reason
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether calls to the provider are currently blocked
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        self.circuit_open_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Time left until the circuit closes
    #[must_use]
    pub fn circuit_remaining(&self) -> Option<Duration> {
        self.circuit_open_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Record a successful call.
    ///
    /// Returns the previous status when it changed.
    pub fn record_success(&mut self, latency: Duration) -> Option<ProviderStatus> {
        let previous = self.status;
        let sample = latency.as_secs_f64() * 1000.0;

        self.request_count += 1;
        self.consecutive_failures = 0;
        self.circuit_open_until = None;
        self.status = ProviderStatus::Healthy;
        self.avg_latency_ms = Some(match self.avg_latency_ms {
            Some(avg) => LATENCY_EMA_ALPHA.mul_add(sample, (1.0 - LATENCY_EMA_ALPHA) * avg),
            None => sample,
        });
        self.updated_at = Utc::now();

        if previous == ProviderStatus::Healthy {
            None
        } else {
            info!(
                provider = %self.provider_id,
                previous = %previous,
                "Provider recovered"
            );
            Some(previous)
        }
    }

    /// Record a failed call.
    ///
    /// Returns the previous status when it changed.
    pub fn record_failure(&mut self, error: impl Into<String>) -> Option<ProviderStatus> {
        let previous = self.status;
        let threshold = self.config.failure_threshold.max(1);

        self.request_count += 1;
        self.error_count += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();

        if self.consecutive_failures >= threshold {
            self.status = ProviderStatus::Unhealthy;
            self.circuit_open_until = Some(Instant::now() + self.config.cooldown);
            warn!(
                provider = %self.provider_id,
                failures = self.consecutive_failures,
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "Circuit breaker opened"
            );
        } else if self.consecutive_failures * 2 >= threshold {
            self.status = ProviderStatus::Degraded;
            debug!(
                provider = %self.provider_id,
                failures = self.consecutive_failures,
                threshold = threshold,
                "Provider degraded"
            );
        }

        (previous != self.status).then_some(previous)
    }

    /// Note a call that was not attempted because the circuit is open.
    ///
    /// Counters and the circuit deadline are left untouched so the cooldown
    /// is not extended by rejected traffic.
    pub fn record_rejection(&mut self) {
        self.last_error = Some(CIRCUIT_OPEN_REASON.to_string());
        self.updated_at = Utc::now();
    }

    /// Mark the provider unhealthy without opening its circuit (failed initialization)
    pub fn mark_unhealthy(&mut self, error: impl Into<String>) {
        self.status = ProviderStatus::Unhealthy;
        self.last_error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Serializable view of the current state
    #[must_use]
    pub fn snapshot(&self) -> HealthSnapshot {
        let remaining = self.circuit_remaining();
        HealthSnapshot {
            provider_id: self.provider_id.clone(),
            status: self.status,
            consecutive_failures: self.consecutive_failures,
            request_count: self.request_count,
            error_count: self.error_count,
            avg_latency_ms: self.avg_latency_ms,
            circuit_open: remaining.is_some(),
            circuit_remaining_ms: remaining.map(|d| d.as_millis() as u64),
            last_error: self.last_error.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Point-in-time health of one provider, for external polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Provider identifier
    pub provider_id: String,
    /// Current status
    pub status: ProviderStatus,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Total recorded calls
    pub request_count: u64,
    /// Total recorded failures
    pub error_count: u64,
    /// Moving average of successful call latency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
    /// Whether calls are currently blocked
    pub circuit_open: bool,
    /// Time left until the circuit closes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit_remaining_ms: Option<u64>,
    /// Last recorded failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Time of the last update
    pub updated_at: DateTime<Utc>,
}

impl HealthSnapshot {
    /// Failure ratio over all recorded calls
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.error_count as f64 / self.request_count as f64
        }
    }
}
