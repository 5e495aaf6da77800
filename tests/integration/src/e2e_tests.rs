//! End-to-end tests
//!
//! Configuration file, resilient extraction gateway, orchestrator and
//! telemetry wired together the way the engine is deployed.

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_providers::*;
use crate::mock_rules::*;
use claimcheck_config::{ClaimcheckConfig, ConfigFormat};
use claimcheck_core::{Phase, ProviderError, RuleStatus};
use claimcheck_pipeline::{
    ExtractionGateway, ExtractionRequest, ExtractionResponse, LlmCodeExtractor, OrchestratorConfig,
    RiskScorer, RuleRegistry, TelemetryObserver, ValidationDecision, ValidationOrchestrator,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

type ModelProvider = ScriptedProvider<ExtractionRequest, ExtractionResponse>;

const CONFIG: &str = r"
gateway:
  timeout: 2s
  retry_attempts: 1
  retry_base_delay: 10ms
  circuit_breaker_threshold: 3
  circuit_breaker_cooldown: 30s
orchestrator:
  rule_timeout: 5s
risk:
  weights:
    crosswalk: 0.3
";

struct Engine {
    orchestrator: ValidationOrchestrator,
    gateway: Arc<ExtractionGateway>,
    rules: Vec<Arc<MockRule>>,
}

fn engine(
    config: &ClaimcheckConfig,
    primary: &Arc<ModelProvider>,
    fallback: &Arc<ModelProvider>,
    telemetry: &TestTelemetry,
) -> Engine {
    let observer = TelemetryObserver::new()
        .with_metrics(Arc::clone(&telemetry.metrics))
        .with_audit(Arc::clone(&telemetry.audit));
    let gateway_config = config
        .gateway
        .gateway_config("primary-llm", Some("backup-llm"));
    let gateway = Arc::new(
        ExtractionGateway::new(gateway_config, primary.shared(), Some(fallback.shared()))
            .unwrap()
            .with_observer(Arc::new(observer)),
    );

    let mut registry = RuleRegistry::new();
    registry
        .register_document_processor(MockDocumentProcessor::new(
            "Type 2 diabetes mellitus without complications. Office visit, low complexity.",
        ))
        .unwrap();
    registry
        .register_code_extractor(Arc::new(LlmCodeExtractor::new(Arc::clone(&gateway))))
        .unwrap();
    let rules = register_passing_rules(&mut registry);

    let settings = &config.orchestrator;
    let mut orchestrator_config = OrchestratorConfig::default()
        .with_llm_rules(settings.run_llm_rules)
        .with_forensics(settings.run_forensics);
    if let Some(timeout) = settings.rule_timeout {
        orchestrator_config = orchestrator_config.with_rule_timeout(timeout);
    }

    let orchestrator = ValidationOrchestrator::new(registry)
        .with_config(orchestrator_config)
        .with_scorer(RiskScorer::new().with_weight_overrides(config.risk.weights.clone()))
        .with_metrics(Arc::clone(&telemetry.metrics))
        .with_audit(Arc::clone(&telemetry.audit));

    Engine {
        orchestrator,
        gateway,
        rules,
    }
}

fn config() -> ClaimcheckConfig {
    ClaimcheckConfig::parse(CONFIG, ConfigFormat::Yaml).unwrap()
}

#[tokio::test]
async fn test_fallback_extraction_feeds_validation() {
    init_tracing();
    let telemetry = TestTelemetry::new();
    let config = config();
    let primary = Arc::new(ModelProvider::down("primary-llm"));
    let fallback = Arc::new(ModelProvider::healthy(
        "backup-llm",
        diabetes_codes(Some(0.88)),
    ));
    let engine = engine(&config, &primary, &fallback, &telemetry);

    let result = engine
        .orchestrator
        .validate_comprehensive(claim_with_clinical_note())
        .await
        .unwrap();
    telemetry.audit.shutdown("test complete").await;

    assert_eq!(result.decision, ValidationDecision::Approved);
    assert_eq!(result.diagnosis_codes, vec!["E11.9"]);
    assert_eq!(result.procedure_codes, vec!["99213"]);
    for rule in &engine.rules {
        assert_eq!(rule.last_codes().unwrap().0, vec!["E11.9"]);
    }

    let extraction = result.outcome("code_extraction").unwrap();
    assert_eq!(extraction.status, RuleStatus::Passed);
    assert_close(extraction.confidence, 0.88);
    assert_eq!(extraction.details["provider"], serde_json::json!("backup-llm"));
    assert_eq!(extraction.details["fallback_used"], serde_json::json!(true));

    // Unavailability is not retried
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(
        telemetry.sample(
            "claimcheck_gateway_fallbacks_total",
            &["primary=\"primary-llm\"", "fallback=\"backup-llm\""]
        ),
        Some(1.0)
    );
    assert!(result.phase_timing(Phase::DataExtraction).is_some());
}

#[tokio::test]
async fn test_extraction_outage_degrades_to_warning() {
    let telemetry = TestTelemetry::new();
    let config = config();
    let primary = Arc::new(ModelProvider::down("primary-llm"));
    let fallback = Arc::new(ModelProvider::new(
        "backup-llm",
        Reply::err(ProviderError::other("backup-llm", "invalid JSON in reply")),
    ));
    let engine = engine(&config, &primary, &fallback, &telemetry);

    let result = engine
        .orchestrator
        .validate_comprehensive(claim_with_clinical_note())
        .await
        .unwrap();

    let extraction = result.outcome("code_extraction").unwrap();
    assert_eq!(extraction.status, RuleStatus::Error);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.starts_with("data_extraction:") && w.contains("invalid JSON")));

    // Later phases still run, without codes
    assert_eq!(result.rules_passed, 5);
    assert!(result.diagnosis_codes.is_empty());
    for rule in &engine.rules {
        assert_eq!(rule.runs(), 1);
    }
}

#[tokio::test]
async fn test_repeated_outages_open_the_primary_circuit() {
    let telemetry = TestTelemetry::new();
    let config = config();
    let primary = Arc::new(ModelProvider::down("primary-llm"));
    let fallback = Arc::new(ModelProvider::healthy("backup-llm", diabetes_codes(None)));
    let engine = engine(&config, &primary, &fallback, &telemetry);

    for n in 0..5 {
        let result = engine
            .orchestrator
            .validate_comprehensive(claim_with_clinical_note())
            .await
            .unwrap();
        assert_eq!(result.outcome("code_extraction").unwrap().status, RuleStatus::Passed, "run {n}");
    }

    // Threshold of three: later runs skip the primary entirely
    assert_eq!(primary.calls(), 3);
    assert_eq!(fallback.calls(), 5);
    assert!(engine.gateway.is_circuit_open("primary-llm"));
    assert_eq!(
        telemetry.sample(
            "claimcheck_gateway_calls_total",
            &["provider=\"primary-llm\"", "outcome=\"rejected\""]
        ),
        Some(2.0)
    );
}
