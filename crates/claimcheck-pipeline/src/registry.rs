//! Rule registration.

use claimcheck_core::{CodeExtractor, DocumentProcessor, Phase, RuleExecutor, ValidationError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Executors of every pipeline phase, keyed by unique rule id
#[derive(Default)]
pub struct RuleRegistry {
    document_processors: Vec<Arc<dyn DocumentProcessor>>,
    code_extractors: Vec<Arc<dyn CodeExtractor>>,
    rules: HashMap<Phase, Vec<Arc<dyn RuleExecutor>>>,
    rule_ids: HashSet<String>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.rule_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("RuleRegistry").field("rules", &ids).finish()
    }
}

impl RuleRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a phase 1 document processor
    ///
    /// # Errors
    /// Returns error if the rule id is blank or already registered
    pub fn register_document_processor(
        &mut self,
        processor: Arc<dyn DocumentProcessor>,
    ) -> Result<(), ValidationError> {
        self.claim_id(processor.rule_id(), Phase::DocumentProcessing)?;
        self.document_processors.push(processor);
        Ok(())
    }

    /// Register a phase 2 code extractor
    ///
    /// # Errors
    /// Returns error if the rule id is blank or already registered
    pub fn register_code_extractor(
        &mut self,
        extractor: Arc<dyn CodeExtractor>,
    ) -> Result<(), ValidationError> {
        self.claim_id(extractor.rule_id(), Phase::DataExtraction)?;
        self.code_extractors.push(extractor);
        Ok(())
    }

    /// Register a rule in one of the concurrent phases (3-6)
    ///
    /// # Errors
    /// Returns error if the phase is not a concurrent phase, or the rule id is
    /// blank or already registered
    pub fn register_rule(
        &mut self,
        phase: Phase,
        rule: Arc<dyn RuleExecutor>,
    ) -> Result<(), ValidationError> {
        if !Phase::CONCURRENT.contains(&phase) {
            return Err(ValidationError::Registry(format!(
                "rule '{}' cannot be registered in phase {phase}",
                rule.rule_id()
            )));
        }
        self.claim_id(rule.rule_id(), phase)?;
        self.rules.entry(phase).or_default().push(rule);
        Ok(())
    }

    fn claim_id(&mut self, rule_id: &str, phase: Phase) -> Result<(), ValidationError> {
        if rule_id.trim().is_empty() {
            return Err(ValidationError::Registry("rule id cannot be empty".to_string()));
        }
        if !self.rule_ids.insert(rule_id.to_string()) {
            return Err(ValidationError::Registry(format!(
                "rule '{rule_id}' is already registered"
            )));
        }
        debug!(rule_id = %rule_id, phase = %phase, "Rule registered");
        Ok(())
    }

    /// Phase 1 executors, in registration order
    #[must_use]
    pub fn document_processors(&self) -> &[Arc<dyn DocumentProcessor>] {
        &self.document_processors
    }

    /// Phase 2 executors, in registration order
    #[must_use]
    pub fn code_extractors(&self) -> &[Arc<dyn CodeExtractor>] {
        &self.code_extractors
    }

    /// Executors of a concurrent phase, in registration order
    #[must_use]
    pub fn rules_for(&self, phase: Phase) -> &[Arc<dyn RuleExecutor>] {
        self.rules.get(&phase).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether a rule id is registered
    #[must_use]
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rule_ids.contains(rule_id)
    }

    /// Number of registered executors across all phases
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_ids.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule_ids.is_empty()
    }
}
