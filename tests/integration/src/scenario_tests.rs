//! Claim scenarios through the full orchestrator

use crate::fixtures::*;
use crate::helpers::*;
use crate::mock_rules::*;
use claimcheck_core::Phase;
use claimcheck_pipeline::{
    RiskCategory, RiskLevel, RiskScorer, RuleRegistry, ValidationDecision, ValidationOrchestrator,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Rule set of a typical professional claim, all passing
fn standard_rules() -> Vec<(Phase, &'static str)> {
    vec![
        (Phase::FraudDetection, "fraud_detection"),
        (Phase::FraudDetection, "upcoding"),
        (Phase::FraudDetection, "duplicate_billing"),
        (Phase::MedicalValidation, "medical_necessity"),
        (Phase::MedicalValidation, "ncci_edits"),
        (Phase::DocumentationCheck, "documentation"),
        (Phase::CoverageValidation, "coverage"),
        (Phase::CoverageValidation, "eligibility"),
    ]
}

/// Diabetes office visit where only the diagnosis/procedure crosswalk fails
#[tokio::test]
async fn test_single_crosswalk_failure_is_approved_with_warnings() {
    init_tracing();
    let mut registry = RuleRegistry::new();
    registry
        .register_code_extractor(MockCodeExtractor::new(&["E11.65"], &["99214"]))
        .unwrap();
    for (phase, id) in standard_rules() {
        registry.register_rule(phase, MockRule::passing(id)).unwrap();
    }
    let crosswalk = MockRule::failing("crosswalk", 0.85, 1);
    registry
        .register_rule(Phase::MedicalValidation, crosswalk.clone())
        .unwrap();

    let result = ValidationOrchestrator::new(registry)
        .validate_comprehensive(diabetes_office_visit())
        .await
        .unwrap();

    assert_eq!(result.rules_failed, 1);
    assert_eq!(result.rules_skipped, 1);
    assert_eq!(result.decision, ValidationDecision::ApprovedWithWarnings);
    assert!(result.is_approved());

    let risk = &result.risk_assessment;
    assert!(risk.risk_level <= RiskLevel::Medium);
    assert_eq!(risk.factors.len(), 1);
    assert_eq!(risk.factors[0].source, "crosswalk");
    assert_eq!(risk.primary_category, Some(RiskCategory::Coding));
    assert!(!risk.requires_investigation);

    // Supplied codes are validated as-is; extraction does not run
    assert_eq!(result.diagnosis_codes, vec!["E11.9"]);
    assert_eq!(result.procedure_codes, vec!["99213"]);
    let (diagnosis, procedures) = crosswalk.last_codes().unwrap();
    assert_eq!(diagnosis, vec!["E11.9"]);
    assert_eq!(procedures, vec!["99213"]);
}

/// Five failed rules each flagging a critical issue
#[tokio::test]
async fn test_critical_failures_reject_with_bounded_score() {
    let critical = [
        (Phase::FraudDetection, "fraud_detection", "billing pattern matches known fraud ring"),
        (Phase::FraudDetection, "upcoding", "E/M level exceeds documented complexity"),
        (Phase::FraudDetection, "duplicate_billing", "identical claim paid on 2024-03-02"),
        (Phase::MedicalValidation, "ncci_edits", "column 2 code billed without modifier"),
        (Phase::CoverageValidation, "eligibility", "member terminated before date of service"),
    ];

    let mut registry = RuleRegistry::new();
    for (phase, id, issue) in critical {
        registry
            .register_rule(phase, Arc::new(MockRule::new(id, Behavior::Critical(issue))))
            .unwrap();
    }
    registry
        .register_rule(Phase::DocumentationCheck, MockRule::passing("documentation"))
        .unwrap();

    let result = ValidationOrchestrator::new(registry)
        .validate_comprehensive(diabetes_office_visit())
        .await
        .unwrap();

    assert_eq!(result.rules_failed, 5);
    assert_eq!(result.critical_issues.len(), 5);
    assert_eq!(result.decision, ValidationDecision::Rejected);
    assert!(result.overall_confidence > 0.9);

    // Each critical issue is folded into the failed rule that raised it
    let risk = &result.risk_assessment;
    assert_eq!(risk.factors.len(), 5);
    assert!(risk.factors.iter().all(|f| f.source != "critical_issue"));
    assert_close(risk.compound_multiplier, 1.4);
    assert_close(risk.risk_score, 1.0);
    assert_eq!(risk.risk_level, RiskLevel::Critical);
    assert_eq!(risk.primary_category, Some(RiskCategory::Fraud));
    assert!(risk.requires_investigation);
    assert_eq!(risk.recommendation, "Route to special investigations unit");
}

/// A lone critical issue rejects even when every other signal is clean
#[tokio::test]
async fn test_single_critical_issue_rejects() {
    let mut registry = RuleRegistry::new();
    for (phase, id) in standard_rules() {
        if id == "duplicate_billing" {
            continue;
        }
        registry.register_rule(phase, MockRule::passing(id)).unwrap();
    }
    registry
        .register_rule(
            Phase::FraudDetection,
            Arc::new(MockRule::new(
                "duplicate_billing",
                Behavior::Critical("claim already adjudicated"),
            )),
        )
        .unwrap();

    let result = ValidationOrchestrator::new(registry)
        .validate_comprehensive(diabetes_office_visit())
        .await
        .unwrap();

    assert_eq!(result.rules_failed, 1);
    assert_eq!(result.critical_issues, vec!["claim already adjudicated"]);
    assert_eq!(result.decision, ValidationDecision::Rejected);
}

#[tokio::test]
async fn test_weight_overrides_change_the_outcome() {
    let build = |scorer: RiskScorer| {
        let mut registry = RuleRegistry::new();
        registry
            .register_rule(Phase::CoverageValidation, MockRule::passing("coverage"))
            .unwrap();
        registry
            .register_rule(Phase::MedicalValidation, MockRule::failing("crosswalk", 0.85, 1))
            .unwrap();
        ValidationOrchestrator::new(registry).with_scorer(scorer)
    };

    let default = build(RiskScorer::new())
        .validate_comprehensive(diabetes_office_visit())
        .await
        .unwrap();
    let lenient = build(RiskScorer::new().with_weight_overrides([("crosswalk", 0.1)]))
        .validate_comprehensive(diabetes_office_visit())
        .await
        .unwrap();

    assert_eq!(default.risk_assessment.risk_level, RiskLevel::Medium);
    assert_eq!(lenient.risk_assessment.risk_level, RiskLevel::Low);
    assert!(lenient.risk_assessment.risk_score < default.risk_assessment.risk_score);
    // One failed rule still warns
    assert_eq!(lenient.decision, ValidationDecision::ApprovedWithWarnings);
}
