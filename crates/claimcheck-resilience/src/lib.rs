//! # Claimcheck Resilience
//!
//! Resilience patterns for calls to external providers:
//! - Per-provider health tracking with a circuit breaker
//! - Retry policy with exponential backoff for rate limiting
//! - Per-call timeouts
//! - Primary/fallback failover behind [`ResilientGateway`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod gateway;
pub mod health;
pub mod retry;
pub mod timeout;

// Re-export main types
pub use gateway::{
    CallOutcome, GatewayConfig, GatewayObserver, GatewayResult, ResilientGateway, SharedProvider,
};
pub use health::{CircuitBreakerConfig, HealthSnapshot, ProviderHealth, ProviderStatus};
pub use retry::{RetryConfig, RetryPolicy, RetryResult};
pub use timeout::call_with_timeout;
