//! Configurable rule executors for integration testing

use async_trait::async_trait;
use claimcheck_core::{
    ClaimContext, CodeExtractor, DocumentProcessor, ExtractedCodes, ProcessedDocuments, RuleError,
    RuleExecutor, RuleIdentity, RuleOutcome,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// What a [`MockRule`] does when it runs
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Pass with the given confidence
    Pass(f64),
    /// Fail with confidence and issue count
    Fail {
        /// Confidence in the failure
        confidence: f64,
        /// Issues found
        issues: u32,
    },
    /// Fail and flag a critical issue
    Critical(&'static str),
    /// Warn with a message
    Warn(&'static str),
    /// Return an infrastructure error
    Error(&'static str),
    /// Panic inside the executor
    Panic(&'static str),
    /// Sleep, then pass
    Slow(Duration),
}

/// Rule executor with scripted behavior that records the codes it saw
#[derive(Debug)]
pub struct MockRule {
    id: String,
    name: String,
    behavior: Behavior,
    uses_llm: bool,
    uses_forensics: bool,
    seen: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl MockRule {
    /// Create a rule; the name is derived from the id
    pub fn new(id: impl Into<String>, behavior: Behavior) -> Self {
        let id = id.into();
        Self {
            name: display_name(&id),
            id,
            behavior,
            uses_llm: false,
            uses_forensics: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Passing rule
    pub fn passing(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(id, Behavior::Pass(0.9)))
    }

    /// Failing rule
    pub fn failing(id: impl Into<String>, confidence: f64, issues: u32) -> Arc<Self> {
        Arc::new(Self::new(id, Behavior::Fail { confidence, issues }))
    }

    /// Mark the rule as calling a language model
    #[must_use]
    pub fn with_llm(mut self) -> Self {
        self.uses_llm = true;
        self
    }

    /// Mark the rule as forensic
    #[must_use]
    pub fn with_forensics(mut self) -> Self {
        self.uses_forensics = true;
        self
    }

    /// Number of times the rule ran
    pub fn runs(&self) -> usize {
        self.seen.lock().len()
    }

    /// Diagnosis and procedure codes seen on the last run
    pub fn last_codes(&self) -> Option<(Vec<String>, Vec<String>)> {
        self.seen.lock().last().cloned()
    }
}

impl RuleIdentity for MockRule {
    fn rule_id(&self) -> &str {
        &self.id
    }

    fn rule_name(&self) -> &str {
        &self.name
    }

    fn uses_llm(&self) -> bool {
        self.uses_llm
    }

    fn uses_forensics(&self) -> bool {
        self.uses_forensics
    }
}

#[async_trait]
impl RuleExecutor for MockRule {
    async fn validate(&self, ctx: &ClaimContext) -> Result<RuleOutcome, RuleError> {
        self.seen
            .lock()
            .push((ctx.diagnosis_codes.clone(), ctx.procedure_codes.clone()));

        let (id, name) = (self.id.as_str(), self.name.as_str());
        match &self.behavior {
            Behavior::Pass(confidence) => Ok(RuleOutcome::passed(id, name, *confidence)),
            Behavior::Fail { confidence, issues } => {
                Ok(RuleOutcome::failed(id, name, *confidence, *issues))
            }
            Behavior::Critical(issue) => {
                Ok(RuleOutcome::failed(id, name, 0.95, 1).with_critical_issue(*issue))
            }
            Behavior::Warn(message) => Ok(RuleOutcome::warning(id, name, 0.8, *message)),
            Behavior::Error(message) => Err(RuleError::infrastructure(id, *message)),
            Behavior::Panic(message) => panic!("{message}"),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(RuleOutcome::passed(id, name, 0.9))
            }
        }
    }
}

/// Document processor returning fixed text per document
#[derive(Debug)]
pub struct MockDocumentProcessor {
    text: String,
    fail: bool,
}

impl MockDocumentProcessor {
    /// Processor that extracts `text`
    pub fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: text.into(),
            fail: false,
        })
    }

    /// Processor whose backend is down
    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            text: String::new(),
            fail: true,
        })
    }
}

impl RuleIdentity for MockDocumentProcessor {
    fn rule_id(&self) -> &str {
        "document_processing"
    }

    fn rule_name(&self) -> &str {
        "Document Processing"
    }
}

#[async_trait]
impl DocumentProcessor for MockDocumentProcessor {
    async fn process(&self, ctx: &ClaimContext) -> Result<ProcessedDocuments, RuleError> {
        if self.fail {
            return Err(RuleError::infrastructure(self.rule_id(), "OCR backend unavailable"));
        }
        Ok(ProcessedDocuments {
            outcome: RuleOutcome::passed(self.rule_id(), self.rule_name(), 0.95),
            text: ctx.documents.iter().map(|_| self.text.clone()).collect(),
        })
    }
}

/// Code extractor returning fixed codes
#[derive(Debug)]
pub struct MockCodeExtractor {
    diagnosis: Vec<String>,
    procedures: Vec<String>,
}

impl MockCodeExtractor {
    /// Extractor producing the given codes
    pub fn new(diagnosis: &[&str], procedures: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            diagnosis: diagnosis.iter().map(ToString::to_string).collect(),
            procedures: procedures.iter().map(ToString::to_string).collect(),
        })
    }
}

impl RuleIdentity for MockCodeExtractor {
    fn rule_id(&self) -> &str {
        "code_extraction"
    }

    fn rule_name(&self) -> &str {
        "Code Extraction"
    }
}

#[async_trait]
impl CodeExtractor for MockCodeExtractor {
    async fn extract(&self, _ctx: &ClaimContext) -> Result<ExtractedCodes, RuleError> {
        Ok(ExtractedCodes {
            outcome: RuleOutcome::passed(self.rule_id(), self.rule_name(), 0.9),
            diagnosis_codes: self.diagnosis.clone(),
            procedure_codes: self.procedures.clone(),
        })
    }
}

fn display_name(id: &str) -> String {
    id.split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
