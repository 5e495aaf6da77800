//! # Claimcheck Pipeline
//!
//! The validation orchestrator and everything it folds outcomes into:
//! - [`RuleRegistry`] and [`SkipSet`] decide which executors run
//! - [`ValidationOrchestrator`] runs the seven-phase pipeline
//! - [`RiskScorer`] turns outcomes into a [`RiskAssessment`]
//! - [`decide`] derives the [`ValidationDecision`]
//! - [`LlmCodeExtractor`] extracts codes through a resilient gateway
//! - [`TelemetryObserver`] feeds gateway traffic into metrics and the audit trail

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod decision;
pub mod extraction;
pub mod observer;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod risk;
pub mod skip;

pub use decision::{decide, ValidationDecision, REVIEW_CONFIDENCE_THRESHOLD};
pub use extraction::{ExtractionGateway, ExtractionRequest, ExtractionResponse, LlmCodeExtractor};
pub use observer::TelemetryObserver;
pub use orchestrator::{OrchestratorConfig, ValidationOrchestrator};
pub use registry::RuleRegistry;
pub use result::{
    critical_issues, rule_warnings, summarize, ComprehensiveValidationResult, OutcomeSummary,
    PhaseTiming,
};
pub use risk::{RiskAssessment, RiskCategory, RiskFactor, RiskLevel, RiskScorer};
pub use skip::SkipSet;
