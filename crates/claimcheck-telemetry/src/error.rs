//! Telemetry errors.

use thiserror::Error;

/// Errors raised while setting up or using telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Logging could not be initialized
    #[error("failed to initialize logging: {0}")]
    Init(String),

    /// A metric could not be created or registered
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Gathered metrics could not be encoded
    #[error("failed to encode metrics: {0}")]
    Encode(String),

    /// The audit logger is shut down or disabled
    #[error("audit channel closed")]
    AuditClosed,

    /// The audit channel is at capacity
    #[error("audit channel full")]
    AuditFull,

    /// An audit sink rejected a batch
    #[error("audit sink error: {0}")]
    Sink(String),
}
