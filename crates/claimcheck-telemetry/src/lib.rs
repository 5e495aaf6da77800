//! # Claimcheck Telemetry
//!
//! Observability for the claimcheck validation engine.
//!
//! This crate provides:
//! - Structured logging setup on top of `tracing-subscriber`
//! - Prometheus metrics with an engine-owned registry
//! - An audit trail fed through a bounded channel to a background flusher

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod error;
pub mod logging;
pub mod metrics;

// Re-export main types
pub use audit::{
    AuditConfig, AuditEvent, AuditEventBuilder, AuditEventType, AuditLogger, AuditResource,
    AuditSeverity, AuditSink, MemorySink, TracingSink,
};
pub use error::TelemetryError;
pub use logging::{build_filter, init_logging, LoggingConfig};
pub use metrics::{Metrics, MetricsConfig};
