//! Gateway integration tests
//!
//! Retry with backoff, circuit breaking, call timeouts and failover through
//! [`ResilientGateway`] with scripted providers.

use crate::helpers::*;
use crate::mock_providers::*;
use claimcheck_core::ProviderError;
use claimcheck_pipeline::TelemetryObserver;
use claimcheck_resilience::{GatewayConfig, ProviderStatus, ResilientGateway};
use claimcheck_telemetry::AuditEventType;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

type TextProvider = ScriptedProvider<String, String>;

fn request() -> String {
    "extract codes".to_string()
}

/// Rate-limited twice, then served: two backoff sleeps of 1s and 2s
#[tokio::test(start_paused = true)]
async fn test_rate_limited_primary_recovers_after_backoff() {
    init_tracing();
    let primary = Arc::new(
        TextProvider::healthy("primary-llm", "E11.9".to_string()).then([
            Reply::err(rate_limited("primary-llm")),
            Reply::err(rate_limited("primary-llm")),
        ]),
    );
    let config = GatewayConfig::new("primary-llm").with_retry(3, Duration::from_secs(1));
    let gateway = ResilientGateway::new(config, primary.shared(), None).unwrap();

    let start = Instant::now();
    let result = gateway.execute(&request()).await;

    assert!(result.success);
    assert_eq!(result.data.as_deref(), Some("E11.9"));
    assert_eq!(result.provider_used.as_deref(), Some("primary-llm"));
    assert!(!result.fallback_used);
    assert_eq!(primary.calls(), 3);
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(result.latency_ms >= 3000);

    let health = gateway.health();
    assert_eq!(health["primary-llm"].status, ProviderStatus::Healthy);
    assert_eq!(health["primary-llm"].consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fail_over() {
    let primary = Arc::new(TextProvider::new(
        "primary-llm",
        Reply::err(rate_limited("primary-llm")),
    ));
    let fallback = Arc::new(TextProvider::healthy("backup-llm", "99213".to_string()));
    let config = GatewayConfig::new("primary-llm")
        .with_fallback("backup-llm")
        .with_retry(2, Duration::from_millis(100));
    let gateway =
        ResilientGateway::new(config, primary.shared(), Some(fallback.shared())).unwrap();

    let result = gateway.execute(&request()).await;

    assert!(result.success);
    assert!(result.fallback_used);
    assert_eq!(result.provider_used.as_deref(), Some("backup-llm"));
    assert_eq!(primary.calls(), 3);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn test_only_rate_limits_are_retried() {
    let primary = Arc::new(TextProvider::new(
        "primary-llm",
        Reply::err(ProviderError::other("primary-llm", "malformed reply")),
    ));
    let config = GatewayConfig::new("primary-llm").with_retry(3, Duration::from_millis(1));
    let gateway = ResilientGateway::new(config, primary.shared(), None).unwrap();

    let result = gateway.execute(&request()).await;

    assert!(!result.success);
    assert_eq!(primary.calls(), 1);
    assert!(result.error_message().unwrap().contains("malformed reply"));
}

/// Open circuit and no fallback: the call is rejected without reaching the provider
#[tokio::test]
async fn test_open_circuit_without_fallback_rejects() {
    let primary = Arc::new(TextProvider::down("primary-llm"));
    let config = GatewayConfig::new("primary-llm")
        .with_retry(0, Duration::from_millis(1))
        .with_circuit_breaker(1, Duration::from_secs(60));
    let gateway = ResilientGateway::new(config, primary.shared(), None).unwrap();

    let first = gateway.execute(&request()).await;
    assert!(!first.success);
    assert!(gateway.is_circuit_open("primary-llm"));

    let second = gateway.execute(&request()).await;
    assert!(!second.success);
    assert!(second.data.is_none());
    assert_eq!(second.provider_used, None);
    assert!(second.error_message().unwrap().contains("circuit"));
    assert_eq!(primary.calls(), 1);
}

#[tokio::test]
async fn test_open_circuit_routes_to_fallback() {
    let primary = Arc::new(TextProvider::down("primary-llm"));
    let fallback = Arc::new(TextProvider::healthy("backup-llm", "E11.9".to_string()));
    let config = GatewayConfig::new("primary-llm")
        .with_fallback("backup-llm")
        .with_retry(0, Duration::from_millis(1))
        .with_circuit_breaker(1, Duration::from_secs(60));
    let gateway =
        ResilientGateway::new(config, primary.shared(), Some(fallback.shared())).unwrap();

    for _ in 0..3 {
        let result = gateway.execute(&request()).await;
        assert!(result.success);
        assert!(result.fallback_used);
    }

    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_closes_after_cooldown() {
    let primary = Arc::new(
        TextProvider::healthy("primary-llm", "E11.9".to_string()).then([Reply::err(
            ProviderError::unavailable("primary-llm", "connection reset"),
        )]),
    );
    let config = GatewayConfig::new("primary-llm")
        .with_retry(0, Duration::from_millis(1))
        .with_circuit_breaker(1, Duration::from_secs(30));
    let gateway = ResilientGateway::new(config, primary.shared(), None).unwrap();

    assert!(!gateway.execute(&request()).await.success);
    assert!(!gateway.execute(&request()).await.success);
    assert_eq!(primary.calls(), 1);

    tokio::time::advance(Duration::from_secs(31)).await;

    let result = gateway.execute(&request()).await;
    assert!(result.success);
    assert_eq!(result.provider_used.as_deref(), Some("primary-llm"));
    assert!(!gateway.is_circuit_open("primary-llm"));
    assert_eq!(gateway.health()["primary-llm"].status, ProviderStatus::Healthy);
}

#[tokio::test(start_paused = true)]
async fn test_slow_primary_times_out_and_fails_over() {
    let primary = Arc::new(TextProvider::new(
        "primary-llm",
        Reply::ok("late".to_string()).after(Duration::from_secs(10)),
    ));
    let fallback = Arc::new(TextProvider::healthy("backup-llm", "on time".to_string()));
    let config = GatewayConfig::new("primary-llm")
        .with_fallback("backup-llm")
        .with_timeout(Duration::from_secs(1));
    let gateway =
        ResilientGateway::new(config, primary.shared(), Some(fallback.shared())).unwrap();

    let result = gateway.execute(&request()).await;

    assert!(result.success);
    assert_eq!(result.data.as_deref(), Some("on time"));
    assert!(result.latency_ms < 10_000);
    let health = gateway.health();
    assert!(health["primary-llm"]
        .last_error
        .as_deref()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn test_both_providers_failing_reports_both() {
    let primary = Arc::new(TextProvider::down("primary-llm"));
    let fallback = Arc::new(TextProvider::down("backup-llm"));
    let config = GatewayConfig::new("primary-llm")
        .with_fallback("backup-llm")
        .with_retry(0, Duration::from_millis(1));
    let gateway =
        ResilientGateway::new(config, primary.shared(), Some(fallback.shared())).unwrap();

    let result = gateway.execute(&request()).await;

    assert!(!result.success);
    assert!(!result.fallback_used);
    let message = result.error_message().unwrap();
    assert!(message.contains("primary-llm"));
    assert!(message.contains("backup-llm"));
    assert!(result.into_result().is_err());
}

#[tokio::test]
async fn test_health_probe_is_observed() {
    let telemetry = TestTelemetry::new();
    let observer = TelemetryObserver::new()
        .with_metrics(Arc::clone(&telemetry.metrics))
        .with_audit(Arc::clone(&telemetry.audit));

    let primary = Arc::new(
        TextProvider::healthy("primary-llm", "ok".to_string()).with_failing_probe(),
    );
    let config = GatewayConfig::new("primary-llm").with_circuit_breaker(1, Duration::from_secs(60));
    let gateway = ResilientGateway::new(config, primary.shared(), None)
        .unwrap()
        .with_observer(Arc::new(observer));

    let health = gateway.check_health().await;
    assert_eq!(health["primary-llm"].status, ProviderStatus::Unhealthy);
    assert!(health["primary-llm"].circuit_open);

    telemetry.audit.shutdown("test complete").await;
    let changes: Vec<_> = telemetry
        .sink
        .events()
        .into_iter()
        .filter(|e| e.event_type == AuditEventType::ProviderHealthChange)
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].metadata["from"], serde_json::json!("healthy"));
    assert_eq!(changes[0].metadata["to"], serde_json::json!("unhealthy"));
}

/// Concurrent phases sharing one provider must not lose health updates
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_keep_every_health_update() {
    const CALLS: usize = 200;

    let primary = Arc::new(TextProvider::down("primary-llm"));
    let config = GatewayConfig::new("primary-llm")
        .with_retry(0, Duration::from_millis(1))
        .with_circuit_breaker(10_000, Duration::from_secs(60));
    let gateway = Arc::new(ResilientGateway::new(config, primary.shared(), None).unwrap());

    let tasks: Vec<_> = (0..CALLS)
        .map(|_| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.execute(&request()).await.success })
        })
        .collect();
    for task in tasks {
        assert!(!task.await.unwrap());
    }

    let health = gateway.health();
    let health = &health["primary-llm"];
    assert_eq!(primary.calls(), CALLS);
    assert_eq!(health.request_count, CALLS as u64);
    assert_eq!(health.error_count, CALLS as u64);
    assert_eq!(health.consecutive_failures, CALLS as u32);
    assert!(!health.circuit_open);
}
