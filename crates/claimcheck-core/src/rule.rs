//! Rule executor contracts and pipeline phases.
//!
//! The concrete logic of each rule lives outside the engine. The orchestrator
//! only sees these traits.

use crate::claim::ClaimContext;
use crate::error::RuleError;
use crate::outcome::RuleOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Stage of the validation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 1: OCR and document parsing
    DocumentProcessing,
    /// Phase 2: diagnosis/procedure code extraction
    DataExtraction,
    /// Phase 3: fraud and forensic signals
    FraudDetection,
    /// Phase 4: medical validation sub-rules
    MedicalValidation,
    /// Phase 5: documentation completeness
    DocumentationCheck,
    /// Phase 6: coverage and eligibility
    CoverageValidation,
    /// Phase 7: aggregation, scoring and decision
    Aggregation,
}

impl Phase {
    /// Phases that run concurrently after extraction
    pub const CONCURRENT: [Self; 4] = [
        Self::FraudDetection,
        Self::MedicalValidation,
        Self::DocumentationCheck,
        Self::CoverageValidation,
    ];

    /// Position in the pipeline (1-based)
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Self::DocumentProcessing => 1,
            Self::DataExtraction => 2,
            Self::FraudDetection => 3,
            Self::MedicalValidation => 4,
            Self::DocumentationCheck => 5,
            Self::CoverageValidation => 6,
            Self::Aggregation => 7,
        }
    }

    /// Label form of the phase
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentProcessing => "document_processing",
            Self::DataExtraction => "data_extraction",
            Self::FraudDetection => "fraud_detection",
            Self::MedicalValidation => "medical_validation",
            Self::DocumentationCheck => "documentation_check",
            Self::CoverageValidation => "coverage_validation",
            Self::Aggregation => "aggregation",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and feature flags shared by every kind of executor
pub trait RuleIdentity: Send + Sync {
    /// Stable rule identifier
    fn rule_id(&self) -> &str;

    /// Human readable rule name
    fn rule_name(&self) -> &str;

    /// Whether the rule calls a language model
    fn uses_llm(&self) -> bool {
        false
    }

    /// Whether the rule is a forensic rule
    fn uses_forensics(&self) -> bool {
        false
    }
}

/// A validation rule run in one of the concurrent phases.
///
/// Implementations report domain failures through the outcome status and
/// return `Err` only for infrastructure faults.
#[async_trait]
pub trait RuleExecutor: RuleIdentity {
    /// Validate the claim
    async fn validate(&self, ctx: &ClaimContext) -> Result<RuleOutcome, RuleError>;
}

/// Output of a document processor
#[derive(Debug, Clone)]
pub struct ProcessedDocuments {
    /// Outcome of the processing rule
    pub outcome: RuleOutcome,
    /// Text extracted from the documents
    pub text: Vec<String>,
}

/// Phase 1 executor
#[async_trait]
pub trait DocumentProcessor: RuleIdentity {
    /// Process the claim's documents
    async fn process(&self, ctx: &ClaimContext) -> Result<ProcessedDocuments, RuleError>;
}

/// Output of a code extractor
#[derive(Debug, Clone)]
pub struct ExtractedCodes {
    /// Outcome of the extraction rule
    pub outcome: RuleOutcome,
    /// Extracted diagnosis codes
    pub diagnosis_codes: Vec<String>,
    /// Extracted procedure codes
    pub procedure_codes: Vec<String>,
}

/// Phase 2 executor
#[async_trait]
pub trait CodeExtractor: RuleIdentity {
    /// Extract codes from the claim
    async fn extract(&self, ctx: &ClaimContext) -> Result<ExtractedCodes, RuleError>;
}
