//! Rule outcomes.
//!
//! A [`RuleOutcome`] is the structured result of one rule's execution. Every
//! registered rule yields exactly one outcome per run, including rules that
//! were skipped or whose executor failed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Final status of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// The rule found nothing wrong
    Passed,
    /// The rule found a problem with the claim
    Failed,
    /// The rule found something worth a look but not a failure
    Warning,
    /// The rule was not executed
    Skipped,
    /// The rule's executor failed; nothing is known about the claim
    Error,
}

impl RuleStatus {
    /// Label form of the status
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Warning => "warning",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of one validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Stable rule identifier (e.g. `crosswalk`)
    pub rule_id: String,
    /// Human readable rule name
    pub rule_name: String,
    /// Final status
    pub status: RuleStatus,
    /// Confidence in the status (0.0 - 1.0)
    pub confidence: f64,
    /// Number of issues the rule found
    #[serde(default)]
    pub issues_found: u32,
    /// Rule specific details
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
    /// Issues severe enough to reject the claim outright
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critical_issues: Vec<String>,
    /// Short explanation of the status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Wall-clock execution time in milliseconds
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl RuleOutcome {
    /// Create an outcome with the given status
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        status: RuleStatus,
        confidence: f64,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            status,
            confidence: clamp_confidence(confidence),
            issues_found: 0,
            details: HashMap::new(),
            critical_issues: Vec::new(),
            message: None,
            execution_time_ms: 0,
        }
    }

    /// Create a passed outcome
    #[must_use]
    pub fn passed(rule_id: impl Into<String>, rule_name: impl Into<String>, confidence: f64) -> Self {
        Self::new(rule_id, rule_name, RuleStatus::Passed, confidence)
    }

    /// Create a failed outcome
    #[must_use]
    pub fn failed(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        confidence: f64,
        issues_found: u32,
    ) -> Self {
        let mut outcome = Self::new(rule_id, rule_name, RuleStatus::Failed, confidence);
        outcome.issues_found = issues_found;
        outcome
    }

    /// Create a warning outcome
    #[must_use]
    pub fn warning(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        confidence: f64,
        message: impl Into<String>,
    ) -> Self {
        Self::new(rule_id, rule_name, RuleStatus::Warning, confidence).with_message(message)
    }

    /// Create a skipped outcome. Skipped rules carry no confidence of their own.
    #[must_use]
    pub fn skipped(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(rule_id, rule_name, RuleStatus::Skipped, 0.0).with_message(reason)
    }

    /// Create an error outcome for an executor that failed to run
    #[must_use]
    pub fn error(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(rule_id, rule_name, RuleStatus::Error, 0.0).with_message(message)
    }

    /// Set the message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the issue count
    #[must_use]
    pub fn with_issues(mut self, issues_found: u32) -> Self {
        self.issues_found = issues_found;
        self
    }

    /// Flag a critical issue
    #[must_use]
    pub fn with_critical_issue(mut self, issue: impl Into<String>) -> Self {
        self.critical_issues.push(issue.into());
        self
    }

    /// Add a detail entry
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.details.insert(key.into(), json_value);
        }
        self
    }

    /// Set the execution time
    #[must_use]
    pub fn with_execution_time_ms(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Whether the rule actually ran
    #[must_use]
    pub fn was_executed(&self) -> bool {
        self.status != RuleStatus::Skipped
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
