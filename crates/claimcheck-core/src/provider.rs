//! Provider abstraction.
//!
//! A provider is one external backend (language model, OCR, rules engine,
//! medical NLP service). Requests and responses are opaque to the engine; the
//! only thing it reads from a response is an optional confidence exposed
//! through [`HasConfidence`].

use crate::error::ProviderResult;
use async_trait::async_trait;

/// Capability of a provider response to report its own confidence
pub trait HasConfidence {
    /// Confidence of the response (0.0 - 1.0), if the provider reports one
    fn confidence(&self) -> Option<f64> {
        None
    }
}

impl HasConfidence for String {}

impl HasConfidence for serde_json::Value {
    fn confidence(&self) -> Option<f64> {
        self.get("confidence").and_then(serde_json::Value::as_f64)
    }
}

/// One external backend behind a resilient gateway
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request type
    type Request: Send + Sync;
    /// Response type
    type Response: HasConfidence + Send;

    /// Stable provider identifier
    fn id(&self) -> &str;

    /// Prepare the provider (open clients, warm caches)
    async fn initialize(&self) -> ProviderResult<()> {
        Ok(())
    }

    /// Perform one call
    async fn call(&self, request: &Self::Request) -> ProviderResult<Self::Response>;

    /// Lightweight probe used for out-of-band health checks
    async fn health_check(&self) -> ProviderResult<()> {
        Ok(())
    }
}
