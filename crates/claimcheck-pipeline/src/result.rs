//! Results of a comprehensive validation run.

use crate::decision::ValidationDecision;
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use claimcheck_core::{Phase, RuleOutcome, RuleStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wall-clock duration of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Phase
    pub phase: Phase,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PhaseTiming {
    /// Create a timing entry
    #[must_use]
    pub fn new(phase: Phase, duration: Duration) -> Self {
        Self {
            phase,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Counts and confidence over a list of rule outcomes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Passed rules
    pub passed: usize,
    /// Failed rules
    pub failed: usize,
    /// Rules that raised a warning
    pub warned: usize,
    /// Rules that did not run
    pub skipped: usize,
    /// Rules whose executor failed
    pub errored: usize,
    /// Sum of issues found
    pub total_issues: u32,
    /// Mean confidence of executed rules, 1.0 when none ran
    pub overall_confidence: f64,
}

impl OutcomeSummary {
    /// Number of outcomes summarized
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.warned + self.skipped + self.errored
    }
}

/// Partition outcomes by status and compute the overall confidence.
///
/// Skipped rules carry no confidence and are left out of the mean; errored
/// rules count with their confidence of zero.
#[must_use]
pub fn summarize(outcomes: &[RuleOutcome]) -> OutcomeSummary {
    let mut summary = OutcomeSummary::default();
    let mut confidence_sum = 0.0;
    let mut executed = 0usize;

    for outcome in outcomes {
        match outcome.status {
            RuleStatus::Passed => summary.passed += 1,
            RuleStatus::Failed => summary.failed += 1,
            RuleStatus::Warning => summary.warned += 1,
            RuleStatus::Skipped => summary.skipped += 1,
            RuleStatus::Error => summary.errored += 1,
        }
        summary.total_issues = summary.total_issues.saturating_add(outcome.issues_found);

        if outcome.was_executed() {
            confidence_sum += unit_confidence(outcome.confidence);
            executed += 1;
        }
    }

    summary.overall_confidence = if executed == 0 {
        1.0
    } else {
        confidence_sum / executed as f64
    };
    summary
}

/// NaN counts as no confidence
fn unit_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Critical issues raised by the outcomes, first occurrence wins
#[must_use]
pub fn critical_issues(outcomes: &[RuleOutcome]) -> Vec<String> {
    let mut issues: Vec<String> = Vec::new();
    for issue in outcomes.iter().flat_map(|o| &o.critical_issues) {
        if !issues.contains(issue) {
            issues.push(issue.clone());
        }
    }
    issues
}

/// One warning line per outcome with warning status
#[must_use]
pub fn rule_warnings(outcomes: &[RuleOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.status == RuleStatus::Warning)
        .map(|o| match &o.message {
            Some(message) => format!("{}: {message}", o.rule_name),
            None => format!("{} raised a warning", o.rule_name),
        })
        .collect()
}

/// Result of [`ValidationOrchestrator::validate_comprehensive`](crate::ValidationOrchestrator::validate_comprehensive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveValidationResult {
    /// Identifier of the run
    pub validation_id: String,
    /// Claim identifier
    pub claim_id: String,
    /// Tenant identifier
    pub tenant_id: String,
    /// Final decision
    pub decision: ValidationDecision,
    /// Mean confidence of executed rules
    pub overall_confidence: f64,
    /// Passed rules
    pub rules_passed: usize,
    /// Failed rules
    pub rules_failed: usize,
    /// Rules that raised a warning
    pub rules_warned: usize,
    /// Rules that did not run
    pub rules_skipped: usize,
    /// Rules whose executor failed
    pub rules_errored: usize,
    /// Sum of issues found by all rules
    pub total_issues: u32,
    /// One outcome per registered rule
    pub outcomes: Vec<RuleOutcome>,
    /// Issues that reject the claim
    pub critical_issues: Vec<String>,
    /// Phase failures and rule warnings
    pub warnings: Vec<String>,
    /// Risk scoring result
    pub risk_assessment: RiskAssessment,
    /// Diagnosis codes after extraction
    pub diagnosis_codes: Vec<String>,
    /// Procedure codes after extraction
    pub procedure_codes: Vec<String>,
    /// Duration of each phase
    pub phase_timings: Vec<PhaseTiming>,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds
    pub total_time_ms: u64,
}

impl ComprehensiveValidationResult {
    /// Outcome of a rule
    #[must_use]
    pub fn outcome(&self, rule_id: &str) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| o.rule_id == rule_id)
    }

    /// Timing of a phase
    #[must_use]
    pub fn phase_timing(&self, phase: Phase) -> Option<&PhaseTiming> {
        self.phase_timings.iter().find(|t| t.phase == phase)
    }

    /// Whether the claim was approved, with or without warnings
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(
            self.decision,
            ValidationDecision::Approved | ValidationDecision::ApprovedWithWarnings
        )
    }
}
