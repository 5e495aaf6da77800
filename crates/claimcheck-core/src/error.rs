//! Error types for the validation engine.
//!
//! Provider-facing operations return [`ProviderResult`]; the gateway folds
//! every [`ProviderError`] into its result instead of propagating it.

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure of a single call to an external provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider could not be reached or initialized
    #[error("provider {provider} unavailable: {message}")]
    Unavailable {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
    },

    /// The call exceeded its time budget
    #[error("provider {provider} timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider identifier
        provider: String,
        /// Budget that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// The provider rejected the call because of rate limiting
    #[error("provider {provider} rate limited: {message}")]
    RateLimited {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
        /// Hint from the provider on when to retry
        retry_after: Option<Duration>,
    },

    /// Any other provider failure
    #[error("provider {provider} error: {message}")]
    Other {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
    },
}

/// Coarse classification of provider errors, used for labels and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// See [`ProviderError::Unavailable`]
    Unavailable,
    /// See [`ProviderError::Timeout`]
    Timeout,
    /// See [`ProviderError::RateLimited`]
    RateLimited,
    /// See [`ProviderError::Other`]
    Other,
}

impl ProviderErrorKind {
    /// Label form of the kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderError {
    /// Create an unavailable error
    pub fn unavailable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Create a generic provider error
    pub fn other(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Other {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Provider that produced the error
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Other { provider, .. } => provider,
        }
    }

    /// Classification of the error
    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Unavailable { .. } => ProviderErrorKind::Unavailable,
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::RateLimited { .. } => ProviderErrorKind::RateLimited,
            Self::Other { .. } => ProviderErrorKind::Other,
        }
    }

    /// Only rate limiting is eligible for retry with backoff
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Gateway-level error, produced when a gateway result is converted into a
/// `Result` and when a gateway is constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Every eligible provider failed (or was skipped with an open circuit)
    #[error("all providers failed: {message}")]
    AllProvidersFailed {
        /// Combined failure description
        message: String,
    },

    /// The provider's circuit breaker is open
    #[error("circuit open for provider {provider}")]
    CircuitOpen {
        /// Provider identifier
        provider: String,
    },

    /// A single provider attempt failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The gateway was constructed with inconsistent configuration
    #[error("gateway misconfigured: {message}")]
    Misconfigured {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create an all-providers-failed error
    pub fn all_failed(message: impl Into<String>) -> Self {
        Self::AllProvidersFailed {
            message: message.into(),
        }
    }

    /// Create a circuit-open error
    pub fn circuit_open(provider: impl Into<String>) -> Self {
        Self::CircuitOpen {
            provider: provider.into(),
        }
    }

    /// Create a misconfiguration error
    pub fn misconfigured(message: impl Into<String>) -> Self {
        Self::Misconfigured {
            message: message.into(),
        }
    }
}

/// Infrastructure failure of a rule executor.
///
/// Ordinary validation failures are never errors; they are expressed through
/// [`RuleStatus`](crate::RuleStatus) on a returned outcome.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The executor could not run (backend down, malformed backend reply, ...)
    #[error("rule {rule_id} infrastructure failure: {message}")]
    Infrastructure {
        /// Rule identifier
        rule_id: String,
        /// Error message
        message: String,
    },

    /// The executor exceeded its time budget
    #[error("rule {rule_id} timed out after {timeout_ms}ms")]
    Timeout {
        /// Rule identifier
        rule_id: String,
        /// Budget that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// A gateway-backed executor got no usable provider response
    #[error("rule {rule_id} gateway failure: {source}")]
    Gateway {
        /// Rule identifier
        rule_id: String,
        /// Underlying gateway error
        #[source]
        source: GatewayError,
    },
}

impl RuleError {
    /// Create an infrastructure error
    pub fn infrastructure(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Infrastructure {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(rule_id: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            rule_id: rule_id.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a gateway error
    pub fn gateway(rule_id: impl Into<String>, source: GatewayError) -> Self {
        Self::Gateway {
            rule_id: rule_id.into(),
            source,
        }
    }

    /// Rule that failed
    #[must_use]
    pub fn rule_id(&self) -> &str {
        match self {
            Self::Infrastructure { rule_id, .. }
            | Self::Timeout { rule_id, .. }
            | Self::Gateway { rule_id, .. } => rule_id,
        }
    }
}

/// Hard errors of a validation run
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The input claim is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rule registration was rejected
    #[error("rule registry error: {0}")]
    Registry(String),

    /// Aggregation produced an inconsistent result
    #[error("aggregation failed: {0}")]
    Aggregation(String),
}
