//! Gateway telemetry.

use claimcheck_resilience::{CallOutcome, GatewayObserver, ProviderStatus};
use claimcheck_telemetry::{AuditLogger, Metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Forwards gateway traffic to metrics and provider status changes to the
/// audit trail
#[derive(Debug, Clone, Default)]
pub struct TelemetryObserver {
    metrics: Option<Arc<Metrics>>,
    audit: Option<Arc<AuditLogger>>,
}

impl TelemetryObserver {
    /// Create an observer that records nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls and failovers
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Audit status changes
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }
}

impl GatewayObserver for TelemetryObserver {
    fn on_call(&self, provider_id: &str, outcome: CallOutcome, _latency: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_gateway_call(provider_id, outcome.as_str());
        }
    }

    fn on_fallback(&self, primary_id: &str, fallback_id: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback(primary_id, fallback_id);
        }
    }

    fn on_status_change(&self, provider_id: &str, from: ProviderStatus, to: ProviderStatus) {
        info!(provider = %provider_id, from = %from, to = %to, "Provider status changed");

        if let Some(audit) = &self.audit {
            let (from, to) = (from.to_string(), to.to_string());
            if let Err(e) = audit.log_provider_health(provider_id, &from, &to) {
                warn!(provider = %provider_id, error = %e, "Health change not audited");
            }
        }
    }
}
