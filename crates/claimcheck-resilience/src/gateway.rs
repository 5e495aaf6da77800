//! Resilient provider gateway.
//!
//! A [`ResilientGateway`] wraps one primary provider and an optional fallback.
//! Every call goes through the provider's circuit breaker, a per-call timeout
//! and, for rate limiting only, bounded retry with exponential backoff. The
//! primary attempt is fully resolved before the fallback is tried.
//!
//! Provider failures never escape [`ResilientGateway::execute`]; they are
//! folded into the provider's health and the returned [`GatewayResult`].

use crate::health::{CircuitBreakerConfig, HealthSnapshot, ProviderHealth, ProviderStatus};
use crate::retry::{RetryConfig, RetryPolicy, RetryResult};
use crate::timeout::call_with_timeout;
use claimcheck_core::{GatewayError, HasConfidence, Provider};
use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared handle to a provider behind a gateway
pub type SharedProvider<Req, Resp> = Arc<dyn Provider<Request = Req, Response = Resp>>;

/// Gateway configuration, fixed at construction
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Primary provider identifier
    pub primary_id: String,
    /// Fallback provider identifier
    pub fallback_id: Option<String>,
    /// Try the fallback when the primary fails
    pub fallback_on_error: bool,
    /// Budget of a single provider call
    pub timeout: Duration,
    /// Retries after the first attempt, for rate limiting only
    pub retry_attempts: u32,
    /// Base delay of the exponential backoff
    pub retry_base_delay: Duration,
    /// Cap on a single backoff sleep
    pub retry_max_delay: Duration,
    /// Consecutive failures before a provider's circuit opens
    pub circuit_breaker_threshold: u32,
    /// How long an open circuit blocks calls
    pub circuit_breaker_cooldown: Duration,
}

impl GatewayConfig {
    /// Create a configuration for a primary provider with default policy
    #[must_use]
    pub fn new(primary_id: impl Into<String>) -> Self {
        Self {
            primary_id: primary_id.into(),
            fallback_id: None,
            fallback_on_error: true,
            timeout: Duration::from_secs(30),
            retry_attempts: 2,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(60),
        }
    }

    /// Set the fallback provider
    #[must_use]
    pub fn with_fallback(mut self, fallback_id: impl Into<String>) -> Self {
        self.fallback_id = Some(fallback_id.into());
        self
    }

    /// Enable or disable failover
    #[must_use]
    pub fn with_fallback_on_error(mut self, enabled: bool) -> Self {
        self.fallback_on_error = enabled;
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn with_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_base_delay = base_delay;
        self
    }

    /// Set the backoff cap
    #[must_use]
    pub fn with_retry_max_delay(mut self, max_delay: Duration) -> Self {
        self.retry_max_delay = max_delay;
        self
    }

    /// Set the circuit breaker policy
    #[must_use]
    pub fn with_circuit_breaker(mut self, threshold: u32, cooldown: Duration) -> Self {
        self.circuit_breaker_threshold = threshold;
        self.circuit_breaker_cooldown = cooldown;
        self
    }

    fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            cooldown: self.circuit_breaker_cooldown,
        }
    }

    fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_attempts,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}

/// Outcome of one [`ResilientGateway::execute`] call
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResult<T> {
    /// Whether a provider produced a response
    pub success: bool,
    /// Provider response
    pub data: Option<T>,
    /// Failure description when no provider succeeded
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<GatewayError>,
    /// Provider that produced the response
    pub provider_used: Option<String>,
    /// Wall-clock time of the whole call, retries and failover included
    pub latency_ms: u64,
    /// Confidence reported by the response
    pub confidence: Option<f64>,
    /// Whether the response came from the fallback provider
    pub fallback_used: bool,
}

fn serialize_error<S: serde::Serializer>(
    error: &Option<GatewayError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

impl<T: HasConfidence> GatewayResult<T> {
    fn succeeded(data: T, provider: &str, latency: Duration, fallback_used: bool) -> Self {
        Self {
            success: true,
            confidence: data.confidence(),
            data: Some(data),
            error: None,
            provider_used: Some(provider.to_string()),
            latency_ms: latency.as_millis() as u64,
            fallback_used,
        }
    }
}

impl<T> GatewayResult<T> {
    fn failed(error: GatewayError, latency: Duration) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            provider_used: None,
            latency_ms: latency.as_millis() as u64,
            confidence: None,
            fallback_used: false,
        }
    }

    /// Error message, if the call failed
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    /// Returns the gateway error when no provider succeeded
    pub fn into_result(self) -> Result<T, GatewayError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(error),
            (None, None) => Err(GatewayError::all_failed("no provider response")),
        }
    }
}

/// Outcome label of a single provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The provider answered
    Success,
    /// The provider failed after any retries
    Failure,
    /// The call was not attempted because the circuit is open
    Rejected,
}

impl CallOutcome {
    /// Label form of the outcome
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
        }
    }
}

/// Hook for observing gateway traffic (metrics, audit)
pub trait GatewayObserver: Send + Sync {
    /// A provider attempt finished
    fn on_call(&self, _provider_id: &str, _outcome: CallOutcome, _latency: Duration) {}

    /// A request was served by the fallback provider
    fn on_fallback(&self, _primary_id: &str, _fallback_id: &str) {}

    /// A provider changed health status
    fn on_status_change(&self, _provider_id: &str, _from: ProviderStatus, _to: ProviderStatus) {}
}

/// Fault-tolerant facade over a primary and an optional fallback provider
pub struct ResilientGateway<Req, Resp> {
    config: GatewayConfig,
    primary: SharedProvider<Req, Resp>,
    fallback: Option<SharedProvider<Req, Resp>>,
    health: DashMap<String, ProviderHealth>,
    retry: RetryPolicy,
    observer: Option<Arc<dyn GatewayObserver>>,
}

impl<Req, Resp> std::fmt::Debug for ResilientGateway<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientGateway")
            .field("config", &self.config)
            .field("providers", &self.health.len())
            .finish_non_exhaustive()
    }
}

impl<Req, Resp> ResilientGateway<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: HasConfidence + Send + 'static,
{
    /// Create a gateway.
    ///
    /// # Errors
    /// Returns [`GatewayError::Misconfigured`] if the provider ids do not
    /// match the configuration or the circuit breaker threshold is zero
    pub fn new(
        config: GatewayConfig,
        primary: SharedProvider<Req, Resp>,
        fallback: Option<SharedProvider<Req, Resp>>,
    ) -> Result<Self, GatewayError> {
        if primary.id() != config.primary_id {
            return Err(GatewayError::misconfigured(format!(
                "primary provider id '{}' does not match configured '{}'",
                primary.id(),
                config.primary_id
            )));
        }

        match (&fallback, &config.fallback_id) {
            (Some(provider), Some(id)) if provider.id() != id => {
                return Err(GatewayError::misconfigured(format!(
                    "fallback provider id '{}' does not match configured '{id}'",
                    provider.id()
                )));
            }
            (Some(provider), _) if provider.id() == config.primary_id => {
                return Err(GatewayError::misconfigured(
                    "fallback provider must differ from the primary",
                ));
            }
            (Some(provider), None) => {
                return Err(GatewayError::misconfigured(format!(
                    "fallback provider '{}' given but no fallback_id configured",
                    provider.id()
                )));
            }
            (None, Some(id)) => {
                return Err(GatewayError::misconfigured(format!(
                    "fallback_id '{id}' configured but no fallback provider given"
                )));
            }
            _ => {}
        }

        if config.circuit_breaker_threshold == 0 {
            return Err(GatewayError::misconfigured(
                "circuit_breaker_threshold must be at least 1",
            ));
        }

        Ok(Self {
            retry: RetryPolicy::new(config.retry()),
            config,
            primary,
            fallback,
            health: DashMap::new(),
            observer: None,
        })
    }

    /// Attach an observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn GatewayObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Prepare every configured provider.
    ///
    /// A provider that fails to initialize is marked unhealthy; the gateway
    /// stays usable.
    pub async fn initialize(&self) {
        for provider in self.providers() {
            match provider.initialize().await {
                Ok(()) => {
                    debug!(provider = %provider.id(), "Provider initialized");
                }
                Err(error) => {
                    warn!(
                        provider = %provider.id(),
                        error = %error,
                        "Provider failed to initialize"
                    );
                    let message = error.to_string();
                    let change = self.update_health(provider.id(), |h| {
                        let before = h.status();
                        h.mark_unhealthy(message);
                        (before != h.status()).then_some(before)
                    });
                    self.notify_status(provider.id(), change);
                }
            }
        }
    }

    /// Execute a request with circuit breaking, retry and failover.
    ///
    /// Never fails for provider-level errors; inspect the returned result.
    pub async fn execute(&self, request: &Req) -> GatewayResult<Resp> {
        let start = Instant::now();

        let primary_error = match self.attempt(&self.primary, request).await {
            Ok(response) => {
                return GatewayResult::succeeded(
                    response,
                    &self.config.primary_id,
                    start.elapsed(),
                    false,
                );
            }
            Err(error) => error,
        };

        let fallback = match (&self.fallback, self.config.fallback_on_error) {
            (Some(fallback), true) => fallback,
            _ => return GatewayResult::failed(primary_error, start.elapsed()),
        };

        info!(
            primary = %self.config.primary_id,
            fallback = %fallback.id(),
            reason = %primary_error,
            "Failing over to fallback provider"
        );

        match self.attempt(fallback, request).await {
            Ok(response) => {
                if let Some(observer) = &self.observer {
                    observer.on_fallback(&self.config.primary_id, fallback.id());
                }
                GatewayResult::succeeded(response, fallback.id(), start.elapsed(), true)
            }
            Err(fallback_error) => GatewayResult::failed(
                GatewayError::all_failed(format!(
                    "primary {}: {primary_error}; fallback {}: {fallback_error}",
                    self.config.primary_id,
                    fallback.id()
                )),
                start.elapsed(),
            ),
        }
    }

    /// One provider attempt: circuit check, then timed calls with retry
    async fn attempt(
        &self,
        provider: &SharedProvider<Req, Resp>,
        request: &Req,
    ) -> Result<Resp, GatewayError> {
        let provider: &dyn Provider<Request = Req, Response = Resp> = provider.as_ref();
        let provider_id = provider.id();

        let rejected = self.update_health(provider_id, |h| {
            let open = h.is_circuit_open();
            if open {
                h.record_rejection();
            }
            open
        });
        if rejected {
            debug!(provider = %provider_id, "Circuit open, skipping provider");
            self.notify_call(provider_id, CallOutcome::Rejected, Duration::ZERO);
            return Err(GatewayError::circuit_open(provider_id));
        }

        let timeout = self.config.timeout;
        let started = Instant::now();
        let result = self
            .retry
            .execute(move || call_with_timeout(provider_id, timeout, provider.call(request)))
            .await;

        match result {
            RetryResult::Success {
                value: (response, latency),
                attempts,
            } => {
                debug!(
                    provider = %provider_id,
                    attempts = attempts,
                    latency_ms = latency.as_millis() as u64,
                    "Provider call succeeded"
                );
                let change = self.update_health(provider_id, |h| h.record_success(latency));
                self.notify_status(provider_id, change);
                self.notify_call(provider_id, CallOutcome::Success, latency);
                Ok(response)
            }
            RetryResult::Exhausted { error, attempts }
            | RetryResult::NonRetryable { error, attempts } => {
                warn!(
                    provider = %provider_id,
                    attempts = attempts,
                    kind = %error.kind(),
                    error = %error,
                    "Provider call failed"
                );
                let message = error.to_string();
                let change = self.update_health(provider_id, |h| h.record_failure(message));
                self.notify_status(provider_id, change);
                self.notify_call(provider_id, CallOutcome::Failure, started.elapsed());
                Err(GatewayError::Provider(error))
            }
        }
    }

    /// Whether a provider's circuit is currently open
    #[must_use]
    pub fn is_circuit_open(&self, provider_id: &str) -> bool {
        self.health
            .get(provider_id)
            .is_some_and(|h| h.is_circuit_open())
    }

    /// Current health of every configured provider, without probing
    #[must_use]
    pub fn health(&self) -> HashMap<String, HealthSnapshot> {
        self.providers()
            .map(|p| {
                let snapshot = self.update_health(p.id(), |h| h.snapshot());
                (p.id().to_string(), snapshot)
            })
            .collect()
    }

    /// Probe every configured provider and return the resulting health
    pub async fn check_health(&self) -> HashMap<String, HealthSnapshot> {
        let timeout = self.config.timeout;
        let probes = self.providers().map(|provider| async move {
            let id = provider.id();
            let outcome = call_with_timeout(id, timeout, provider.health_check()).await;
            (id, outcome)
        });

        for (id, outcome) in join_all(probes).await {
            let change = match outcome {
                Ok(((), latency)) => self.update_health(id, |h| h.record_success(latency)),
                Err(error) => {
                    debug!(provider = %id, error = %error, "Health probe failed");
                    let message = error.to_string();
                    self.update_health(id, |h| h.record_failure(message))
                }
            };
            self.notify_status(id, change);
        }

        self.health()
    }

    fn providers(&self) -> impl Iterator<Item = &SharedProvider<Req, Resp>> {
        std::iter::once(&self.primary).chain(self.fallback.iter())
    }

    /// Atomic read-modify-write of one provider's health record
    fn update_health<R>(&self, provider_id: &str, f: impl FnOnce(&mut ProviderHealth) -> R) -> R {
        let mut entry = self
            .health
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(provider_id, self.config.circuit_breaker()));
        f(entry.value_mut())
    }

    fn notify_status(&self, provider_id: &str, previous: Option<ProviderStatus>) {
        let (Some(observer), Some(previous)) = (&self.observer, previous) else {
            return;
        };
        let current = self.update_health(provider_id, |h| h.status());
        observer.on_status_change(provider_id, previous, current);
    }

    fn notify_call(&self, provider_id: &str, outcome: CallOutcome, latency: Duration) {
        if let Some(observer) = &self.observer {
            observer.on_call(provider_id, outcome, latency);
        }
    }
}
