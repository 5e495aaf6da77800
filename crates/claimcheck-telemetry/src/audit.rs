//! Audit trail for validation runs and provider health.
//!
//! Events go through a bounded channel to a dedicated flusher task that
//! writes them to an [`AuditSink`] in batches. The [`AuditLogger`] owns the
//! task's handle; [`AuditLogger::shutdown`] closes the channel, waits for the
//! flusher to write everything still buffered and joins it.

use crate::error::TelemetryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Metadata keys whose values are never written to a sink
const SENSITIVE_KEYS: &[&str] = &[
    "patient_name",
    "date_of_birth",
    "ssn",
    "member_id",
    "api_key",
    "token",
];

/// Audit event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A validation run produced a decision
    ValidationCompleted,
    /// A validation run failed hard
    ValidationFailed,
    /// A provider changed health status
    ProviderHealthChange,
    /// Engine startup
    SystemStartup,
    /// Engine shutdown
    SystemShutdown,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidationCompleted => write!(f, "validation_completed"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ProviderHealthChange => write!(f, "provider_health_change"),
            Self::SystemStartup => write!(f, "system_startup"),
            Self::SystemShutdown => write!(f, "system_shutdown"),
        }
    }
}

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

impl std::fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Resource the event is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResource {
    /// Resource type (claim, provider, engine)
    pub resource_type: String,
    /// Resource identifier
    pub id: String,
}

impl AuditResource {
    /// Create a new resource
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Complete audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier
    pub id: String,
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: AuditEventType,
    /// Event severity
    pub severity: AuditSeverity,
    /// Resource affected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<AuditResource>,
    /// Event description
    pub description: String,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Validation run id for correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Tenant that owns the resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Builder for audit events
#[derive(Debug)]
pub struct AuditEventBuilder {
    event_type: AuditEventType,
    severity: AuditSeverity,
    resource: Option<AuditResource>,
    description: Option<String>,
    metadata: HashMap<String, serde_json::Value>,
    correlation_id: Option<String>,
    tenant_id: Option<String>,
}

impl AuditEventBuilder {
    /// Create a new audit event builder
    #[must_use]
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            severity: AuditSeverity::Info,
            resource: None,
            description: None,
            metadata: HashMap::new(),
            correlation_id: None,
            tenant_id: None,
        }
    }

    /// Set severity
    #[must_use]
    pub fn severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set resource
    #[must_use]
    pub fn resource(mut self, resource: AuditResource) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Set description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add metadata
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), json_value);
        }
        self
    }

    /// Set correlation id
    #[must_use]
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set tenant id
    #[must_use]
    pub fn tenant_id(mut self, id: impl Into<String>) -> Self {
        self.tenant_id = Some(id.into());
        self
    }

    /// Build the audit event
    #[must_use]
    pub fn build(self) -> AuditEvent {
        AuditEvent {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            severity: self.severity,
            resource: self.resource,
            description: self
                .description
                .unwrap_or_else(|| self.event_type.to_string()),
            metadata: self.metadata,
            correlation_id: self.correlation_id,
            tenant_id: self.tenant_id,
        }
    }
}

/// Destination of flushed audit events
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Write one batch of events
    async fn write_batch(&self, events: &[AuditEvent]) -> Result<(), TelemetryError>;
}

/// Sink that writes events as JSON through `tracing` (target `audit`)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    async fn write_batch(&self, events: &[AuditEvent]) -> Result<(), TelemetryError> {
        for event in events {
            let json = serde_json::to_string(event)
                .map_err(|e| TelemetryError::Sink(e.to_string()))?;
            match event.severity {
                AuditSeverity::Error | AuditSeverity::Warning => {
                    warn!(
                        target: "audit",
                        event_type = %event.event_type,
                        severity = %event.severity,
                        "{}",
                        json
                    );
                }
                AuditSeverity::Info => {
                    info!(
                        target: "audit",
                        event_type = %event.event_type,
                        severity = %event.severity,
                        "{}",
                        json
                    );
                }
            }
        }
        Ok(())
    }
}

/// Sink that keeps events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
    batches: Mutex<usize>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written so far
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Number of batches written so far
    #[must_use]
    pub fn batches(&self) -> usize {
        *self.batches.lock()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn write_batch(&self, events: &[AuditEvent]) -> Result<(), TelemetryError> {
        self.events.lock().extend_from_slice(events);
        *self.batches.lock() += 1;
        Ok(())
    }
}

/// Audit logger configuration
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Whether audit logging is enabled
    pub enabled: bool,
    /// Capacity of the event channel
    pub channel_capacity: usize,
    /// Events per sink write
    pub batch_size: usize,
    /// Maximum time an event waits in the buffer
    pub flush_interval: Duration,
    /// Redact sensitive metadata
    pub redact_sensitive: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
            batch_size: 64,
            flush_interval: Duration::from_secs(1),
            redact_sensitive: true,
        }
    }
}

/// Audit logger feeding a background flusher task
pub struct AuditLogger {
    config: AuditConfig,
    sender: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("config", &self.config)
            .field("running", &self.sender.lock().is_some())
            .finish()
    }
}

impl AuditLogger {
    /// Start a logger and its flusher task. Must be called within a tokio runtime.
    #[must_use]
    pub fn start(config: AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
        let flusher = tokio::spawn(run_flusher(
            receiver,
            sink,
            config.batch_size.max(1),
            config.flush_interval,
        ));

        Self {
            config,
            sender: Mutex::new(Some(sender)),
            flusher: Mutex::new(Some(flusher)),
        }
    }

    /// Create a logger that drops every event
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            sender: Mutex::new(None),
            flusher: Mutex::new(None),
        }
    }

    /// Check if audit logging is enabled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Queue an event, waiting for channel capacity
    ///
    /// # Errors
    /// Returns [`TelemetryError::AuditClosed`] after shutdown
    pub async fn log(&self, event: AuditEvent) -> Result<(), TelemetryError> {
        if !self.config.enabled {
            return Ok(());
        }
        let sender = self.sender.lock().clone();
        let sender = sender.ok_or(TelemetryError::AuditClosed)?;
        sender
            .send(self.prepare(event))
            .await
            .map_err(|_| TelemetryError::AuditClosed)
    }

    /// Queue an event without waiting, for callers that cannot await
    ///
    /// # Errors
    /// Returns [`TelemetryError::AuditFull`] when the channel is at capacity
    /// and [`TelemetryError::AuditClosed`] after shutdown
    pub fn try_log(&self, event: AuditEvent) -> Result<(), TelemetryError> {
        if !self.config.enabled {
            return Ok(());
        }
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(TelemetryError::AuditClosed)?;
        sender.try_send(self.prepare(event)).map_err(|e| match e {
            TrySendError::Full(_) => TelemetryError::AuditFull,
            TrySendError::Closed(_) => TelemetryError::AuditClosed,
        })
    }

    /// Record a provider status change
    ///
    /// # Errors
    /// See [`AuditLogger::try_log`]
    pub fn log_provider_health(
        &self,
        provider_id: &str,
        from: &str,
        to: &str,
    ) -> Result<(), TelemetryError> {
        let severity = if to == "healthy" {
            AuditSeverity::Info
        } else {
            AuditSeverity::Warning
        };
        let event = AuditEventBuilder::new(AuditEventType::ProviderHealthChange)
            .severity(severity)
            .resource(AuditResource::new("provider", provider_id))
            .description(format!("Provider {provider_id} changed from {from} to {to}"))
            .metadata("from", from)
            .metadata("to", to)
            .build();
        self.try_log(event)
    }

    /// Record engine startup
    ///
    /// # Errors
    /// See [`AuditLogger::log`]
    pub async fn log_startup(&self, version: &str) -> Result<(), TelemetryError> {
        let event = AuditEventBuilder::new(AuditEventType::SystemStartup)
            .resource(AuditResource::new("engine", "claimcheck"))
            .description(format!("Engine started, version {version}"))
            .metadata("version", version)
            .build();
        self.log(event).await
    }

    /// Record shutdown, close the channel and wait for the flusher to drain it
    pub async fn shutdown(&self, reason: &str) {
        if !self.config.enabled {
            return;
        }

        let event = AuditEventBuilder::new(AuditEventType::SystemShutdown)
            .resource(AuditResource::new("engine", "claimcheck"))
            .description(format!("Engine shutting down: {reason}"))
            .metadata("reason", reason)
            .build();
        if let Err(e) = self.log(event).await {
            debug!(error = %e, "Shutdown event not recorded");
        }

        drop(self.sender.lock().take());
        let flusher = self.flusher.lock().take();
        if let Some(flusher) = flusher {
            if let Err(e) = flusher.await {
                warn!(error = %e, "Audit flusher terminated abnormally");
            }
        }
    }

    fn prepare(&self, event: AuditEvent) -> AuditEvent {
        if self.config.redact_sensitive {
            redact_event(event)
        } else {
            event
        }
    }
}

fn redact_event(mut event: AuditEvent) -> AuditEvent {
    for key in SENSITIVE_KEYS {
        if let Some(value) = event.metadata.get_mut(*key) {
            *value = serde_json::json!("[REDACTED]");
        }
    }
    event
}

async fn run_flusher(
    mut receiver: mpsc::Receiver<AuditEvent>,
    sink: Arc<dyn AuditSink>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut buffer = Vec::with_capacity(batch_size);
    let start = tokio::time::Instant::now() + flush_interval;
    let mut ticker = tokio::time::interval_at(start, flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Some(event) => {
                    buffer.push(event);
                    if buffer.len() >= batch_size {
                        flush(sink.as_ref(), &mut buffer).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => flush(sink.as_ref(), &mut buffer).await,
        }
    }

    flush(sink.as_ref(), &mut buffer).await;
    debug!("Audit flusher stopped");
}

async fn flush(sink: &dyn AuditSink, buffer: &mut Vec<AuditEvent>) {
    if buffer.is_empty() {
        return;
    }
    let batch = std::mem::take(buffer);
    if let Err(e) = sink.write_batch(&batch).await {
        warn!(error = %e, dropped = batch.len(), "Audit sink write failed");
    }
}
