//! Risk scoring.
//!
//! [`RiskScorer::calculate_risk`] folds rule outcomes and critical issues
//! into a single [`RiskAssessment`]. Every failed or warning rule contributes
//! one [`RiskFactor`] weighted by the rule's base severity. A critical issue
//! lifts the factor of the rule that raised it to fraud at critical severity,
//! or stands alone as a fraud factor when no rule claims it. The scorer is
//! pure and can be shared freely between concurrent runs.

use claimcheck_core::{RuleOutcome, RuleStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Score at or above which risk is critical
pub const CRITICAL_THRESHOLD: f64 = 0.7;
/// Score at or above which risk is high
pub const HIGH_THRESHOLD: f64 = 0.5;
/// Score at or above which risk is medium
pub const MEDIUM_THRESHOLD: f64 = 0.3;

/// Base severity of rules missing from the weight table
pub const DEFAULT_WEIGHT: f64 = 0.5;

const WARNING_SEVERITY_FACTOR: f64 = 0.3;
const ISSUE_SEVERITY_STEP: f64 = 0.1;
const DEFAULT_FACTOR_CONFIDENCE: f64 = 0.5;
const COMPOUND_STEP: f64 = 0.1;

const MAX_CRITICAL_FACTORS: usize = 5;
const CRITICAL_SEVERITY: f64 = 0.8;
const CRITICAL_CONFIDENCE: f64 = 0.9;

/// Built-in rule profiles: rule id, base severity, category
const RULE_PROFILES: &[(&str, f64, RiskCategory)] = &[
    ("fraud_detection", 0.9, RiskCategory::Fraud),
    ("forensics", 0.9, RiskCategory::Fraud),
    ("duplicate_billing", 0.85, RiskCategory::Fraud),
    ("upcoding", 0.8, RiskCategory::Fraud),
    ("medical_necessity", 0.7, RiskCategory::MedicalNecessity),
    ("ncci_edits", 0.65, RiskCategory::Coding),
    ("mue_limits", 0.6, RiskCategory::Coding),
    ("lcd_coverage", 0.55, RiskCategory::Coverage),
    ("coverage", 0.5, RiskCategory::Coverage),
    ("documentation", 0.5, RiskCategory::Documentation),
    ("crosswalk", 0.45, RiskCategory::Coding),
    ("eligibility", 0.4, RiskCategory::Coverage),
    ("age_gender", 0.4, RiskCategory::Demographics),
    ("code_extraction", 0.3, RiskCategory::Coding),
    ("document_processing", 0.2, RiskCategory::Documentation),
];

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Score below the medium threshold
    Low,
    /// Score at or above 0.3
    Medium,
    /// Score at or above 0.5
    High,
    /// Score at or above 0.7
    Critical,
}

impl RiskLevel {
    /// Level of a score
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Label form of the level
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Area of concern a risk factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Fraud, waste and abuse signals
    Fraud,
    /// Medical necessity of the billed services
    MedicalNecessity,
    /// Coding accuracy
    Coding,
    /// Documentation completeness
    Documentation,
    /// Coverage and eligibility
    Coverage,
    /// Patient demographics
    Demographics,
    /// Rules without a known category
    Other,
}

impl RiskCategory {
    /// Label form of the category
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fraud => "fraud",
            Self::MedicalNecessity => "medical_necessity",
            Self::Coding => "coding",
            Self::Documentation => "documentation",
            Self::Coverage => "coverage",
            Self::Demographics => "demographics",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighted contributor to the risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Category of the factor
    pub category: RiskCategory,
    /// Rule id, or `critical_issue`
    pub source: String,
    /// Severity (0.0 - 1.0)
    pub severity: f64,
    /// Confidence in the factor (0.0 - 1.0)
    pub confidence: f64,
    /// Human readable description
    pub description: String,
}

impl RiskFactor {
    /// Severity weighted by confidence
    #[must_use]
    pub fn weighted_score(&self) -> f64 {
        self.severity * self.confidence
    }
}

/// Result of risk scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Aggregate score (0.0 - 1.0)
    pub risk_score: f64,
    /// Level derived from the score
    pub risk_level: RiskLevel,
    /// Contributing factors, highest weighted score first
    pub factors: Vec<RiskFactor>,
    /// Multiplier applied for the number of factors
    pub compound_multiplier: f64,
    /// Sum of weighted scores per category
    pub category_scores: BTreeMap<RiskCategory, f64>,
    /// Category with the highest total
    pub primary_category: Option<RiskCategory>,
    /// Recommended handling
    pub recommendation: String,
    /// Whether the claim should be routed to investigation
    pub requires_investigation: bool,
    /// Number of warnings raised during the run
    pub warning_count: usize,
}

#[derive(Debug, Clone, Copy)]
struct RuleProfile {
    weight: f64,
    category: RiskCategory,
}

/// Scores rule outcomes into a [`RiskAssessment`]
#[derive(Debug, Clone)]
pub struct RiskScorer {
    profiles: HashMap<String, RuleProfile>,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskScorer {
    /// Create a scorer with the built-in weight table
    #[must_use]
    pub fn new() -> Self {
        let profiles = RULE_PROFILES
            .iter()
            .map(|&(rule_id, weight, category)| (rule_id.to_string(), RuleProfile { weight, category }))
            .collect();
        Self { profiles }
    }

    /// Override base weights of individual rules. Values are clamped to [0, 1].
    #[must_use]
    pub fn with_weight_overrides<I, K>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        for (rule_id, weight) in overrides {
            let weight = clamp_unit(weight);
            self.profiles
                .entry(rule_id.into())
                .and_modify(|p| p.weight = weight)
                .or_insert(RuleProfile {
                    weight,
                    category: RiskCategory::Other,
                });
        }
        self
    }

    /// Register or replace a rule's weight and category
    #[must_use]
    pub fn with_rule(
        mut self,
        rule_id: impl Into<String>,
        weight: f64,
        category: RiskCategory,
    ) -> Self {
        self.profiles.insert(
            rule_id.into(),
            RuleProfile {
                weight: clamp_unit(weight),
                category,
            },
        );
        self
    }

    /// Base severity of a rule
    #[must_use]
    pub fn weight(&self, rule_id: &str) -> f64 {
        self.profiles
            .get(rule_id)
            .map_or(DEFAULT_WEIGHT, |p| p.weight)
    }

    /// Category of a rule
    #[must_use]
    pub fn category(&self, rule_id: &str) -> RiskCategory {
        self.profiles
            .get(rule_id)
            .map_or(RiskCategory::Other, |p| p.category)
    }

    /// Multiplier applied to the mean factor score when several factors compound
    #[must_use]
    pub fn compound_multiplier(factor_count: usize) -> f64 {
        if factor_count > 1 {
            1.0 + COMPOUND_STEP * (factor_count - 1) as f64
        } else {
            1.0
        }
    }

    /// Score a run.
    ///
    /// Failed rules produce one factor each and warning rules a factor at
    /// reduced severity. Each of the first five critical issues is folded
    /// into the factor of the rule that raised it, lifting it to at least the
    /// critical severity and confidence; issues no rule factor claims become
    /// standalone fraud factors. Warnings are counted but do not create
    /// factors.
    #[must_use]
    pub fn calculate_risk(
        &self,
        outcomes: &[RuleOutcome],
        critical_issues: &[String],
        warnings: &[String],
    ) -> RiskAssessment {
        let mut raised: Vec<(RiskFactor, &[String])> = outcomes
            .iter()
            .filter_map(|outcome| {
                self.rule_factor(outcome)
                    .map(|factor| (factor, outcome.critical_issues.as_slice()))
            })
            .collect();

        let mut standalone = Vec::new();
        for issue in critical_issues.iter().take(MAX_CRITICAL_FACTORS) {
            match raised.iter_mut().find(|(_, issues)| issues.contains(issue)) {
                Some((factor, _)) => fold_critical(factor, issue),
                None => standalone.push(RiskFactor {
                    category: RiskCategory::Fraud,
                    source: "critical_issue".to_string(),
                    severity: CRITICAL_SEVERITY,
                    confidence: CRITICAL_CONFIDENCE,
                    description: issue.clone(),
                }),
            }
        }

        let mut factors: Vec<RiskFactor> = raised.into_iter().map(|(factor, _)| factor).collect();
        factors.extend(standalone);
        factors.sort_by(|a, b| b.weighted_score().total_cmp(&a.weighted_score()));

        let mut category_scores: BTreeMap<RiskCategory, f64> = BTreeMap::new();
        for factor in &factors {
            *category_scores.entry(factor.category).or_insert(0.0) += factor.weighted_score();
        }

        let mut primary_category = None;
        let mut best = 0.0;
        for (&category, &score) in &category_scores {
            if primary_category.is_none() || score > best {
                primary_category = Some(category);
                best = score;
            }
        }

        let compound_multiplier = Self::compound_multiplier(factors.len());
        let risk_score = if factors.is_empty() {
            0.0
        } else {
            let mean = factors.iter().map(RiskFactor::weighted_score).sum::<f64>()
                / factors.len() as f64;
            clamp_unit(mean * compound_multiplier)
        };

        let risk_level = RiskLevel::from_score(risk_score);
        let (recommendation, requires_investigation) = recommend(risk_level, primary_category);

        RiskAssessment {
            risk_score,
            risk_level,
            factors,
            compound_multiplier,
            category_scores,
            primary_category,
            recommendation: recommendation.to_string(),
            requires_investigation,
            warning_count: warnings.len(),
        }
    }

    fn rule_factor(&self, outcome: &RuleOutcome) -> Option<RiskFactor> {
        let weight = self.weight(&outcome.rule_id);
        let severity = match outcome.status {
            RuleStatus::Failed => {
                (weight * ISSUE_SEVERITY_STEP.mul_add(f64::from(outcome.issues_found), 1.0)).min(1.0)
            }
            RuleStatus::Warning => weight * WARNING_SEVERITY_FACTOR,
            RuleStatus::Passed | RuleStatus::Skipped | RuleStatus::Error => return None,
        };

        let confidence = if outcome.confidence > 0.0 {
            clamp_unit(outcome.confidence)
        } else {
            DEFAULT_FACTOR_CONFIDENCE
        };

        let description = match (&outcome.message, outcome.status) {
            (Some(message), _) => format!("{}: {message}", outcome.rule_name),
            (None, RuleStatus::Failed) => format!(
                "{} failed with {} issue(s)",
                outcome.rule_name, outcome.issues_found
            ),
            (None, _) => format!("{} raised a warning", outcome.rule_name),
        };

        Some(RiskFactor {
            category: self.category(&outcome.rule_id),
            source: outcome.rule_id.clone(),
            severity: clamp_unit(severity),
            confidence,
            description,
        })
    }
}

fn fold_critical(factor: &mut RiskFactor, issue: &str) {
    factor.category = RiskCategory::Fraud;
    factor.severity = factor.severity.max(CRITICAL_SEVERITY);
    factor.confidence = factor.confidence.max(CRITICAL_CONFIDENCE);
    factor.description = format!("{} (critical: {issue})", factor.description);
}

fn recommend(level: RiskLevel, primary: Option<RiskCategory>) -> (&'static str, bool) {
    match (level, primary) {
        (RiskLevel::High | RiskLevel::Critical, Some(RiskCategory::Fraud)) => {
            ("Route to special investigations unit", true)
        }
        (RiskLevel::Critical, _) => ("Hold claim and escalate to supervisor review", true),
        (RiskLevel::Medium | RiskLevel::High, Some(RiskCategory::MedicalNecessity)) => {
            ("Refer to clinical reviewer for medical necessity", false)
        }
        (RiskLevel::Medium | RiskLevel::High, _) => ("Supervisor review recommended", false),
        (RiskLevel::Low, _) => ("Proceed with standard processing", false),
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
