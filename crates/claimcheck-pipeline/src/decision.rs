//! Validation decisions.

use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

/// Overall confidence below which a claim needs review
pub const REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.7;

const REJECT_FAILED_RULES: usize = 3;
const REVIEW_FAILED_RULES: usize = 2;

/// Final decision of a validation run.
///
/// Variants are ordered from most to least approved, so `a < b` means `a` is
/// the more favourable decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationDecision {
    /// No problems found
    Approved,
    /// Minor problems found
    ApprovedWithWarnings,
    /// A human must look at the claim
    RequiresReview,
    /// The claim is rejected
    Rejected,
}

impl ValidationDecision {
    /// Label form of the decision
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ApprovedWithWarnings => "approved_with_warnings",
            Self::RequiresReview => "requires_review",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ValidationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the decision. The first matching rule wins:
///
/// 1. rejected on any critical issue, critical risk, or three failed rules
/// 2. review on high risk, low overall confidence, or two failed rules
/// 3. approved with warnings on one failed rule or medium risk
/// 4. approved
#[must_use]
pub fn decide(
    rules_failed: usize,
    critical_issues: usize,
    risk_level: RiskLevel,
    overall_confidence: f64,
) -> ValidationDecision {
    if critical_issues > 0
        || risk_level == RiskLevel::Critical
        || rules_failed >= REJECT_FAILED_RULES
    {
        ValidationDecision::Rejected
    } else if risk_level == RiskLevel::High
        || overall_confidence < REVIEW_CONFIDENCE_THRESHOLD
        || rules_failed >= REVIEW_FAILED_RULES
    {
        ValidationDecision::RequiresReview
    } else if rules_failed == 1 || risk_level == RiskLevel::Medium {
        ValidationDecision::ApprovedWithWarnings
    } else {
        ValidationDecision::Approved
    }
}
