//! Test helper utilities for integration tests

use claimcheck_telemetry::{AuditConfig, AuditLogger, MemorySink, Metrics, MetricsConfig};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static TRACING: OnceLock<()> = OnceLock::new();

/// Initialize tracing for tests (only once, and only when `TEST_LOG` is set)
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        if std::env::var("TEST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Metrics and an audit trail captured in memory
pub struct TestTelemetry {
    /// Engine metrics
    pub metrics: Arc<Metrics>,
    /// Audit logger writing to `sink`
    pub audit: Arc<AuditLogger>,
    /// Captured audit events
    pub sink: Arc<MemorySink>,
}

impl TestTelemetry {
    /// Create telemetry with a short audit flush interval
    pub fn new() -> Self {
        let metrics = Arc::new(Metrics::new(&MetricsConfig::default()).expect("metrics registry"));
        let sink = Arc::new(MemorySink::new());
        let config = AuditConfig {
            flush_interval: Duration::from_millis(10),
            ..AuditConfig::default()
        };
        let audit = Arc::new(AuditLogger::start(config, sink.clone()));
        Self {
            metrics,
            audit,
            sink,
        }
    }

    /// Value of a Prometheus sample whose line contains every label
    pub fn sample(&self, name: &str, labels: &[&str]) -> Option<f64> {
        let text = self.metrics.gather_text().expect("gather metrics");
        text.lines()
            .filter(|line| !line.starts_with('#'))
            .filter(|line| line.split(['{', ' ']).next() == Some(name))
            .find(|line| labels.iter().all(|label| line.contains(label)))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|value| value.parse().ok())
    }
}

impl Default for TestTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert two floats are within `1e-9`
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
