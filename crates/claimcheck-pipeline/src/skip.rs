//! Rule selection for a single run.

use crate::orchestrator::OrchestratorConfig;
use crate::registry::RuleRegistry;
use claimcheck_core::{ClaimValidationInput, Phase, RuleIdentity};
use std::collections::{HashMap, HashSet};

/// Rules that will not run in a validation run, with the reason for each.
///
/// Computed once at the start of a run from the caller's skip list, whether
/// the caller supplied codes or documents, and the language-model and
/// forensic switches (a family runs only when both the process-wide switch
/// and the claim's flag allow it).
#[derive(Debug, Clone, Default)]
pub struct SkipSet {
    reasons: HashMap<String, String>,
}

struct Selection<'a> {
    requested: HashSet<&'a str>,
    has_documents: bool,
    has_codes: bool,
    run_llm_rules: bool,
    run_forensics: bool,
}

impl Selection<'_> {
    fn reason<R: RuleIdentity + ?Sized>(&self, phase: Phase, rule: &R) -> Option<&'static str> {
        if self.requested.contains(rule.rule_id()) {
            Some("skipped by request")
        } else if phase == Phase::DocumentProcessing && !self.has_documents {
            Some("no documents attached")
        } else if phase == Phase::DataExtraction && self.has_codes {
            Some("codes supplied with the claim")
        } else if rule.uses_llm() && !self.run_llm_rules {
            Some("language-model rules disabled")
        } else if rule.uses_forensics() && !self.run_forensics {
            Some("forensic rules disabled")
        } else {
            None
        }
    }
}

impl SkipSet {
    /// Compute the skip set of a run
    #[must_use]
    pub fn compute(
        registry: &RuleRegistry,
        input: &ClaimValidationInput,
        config: &OrchestratorConfig,
    ) -> Self {
        let selection = Selection {
            requested: input.skip_rules.iter().map(|id| id.trim()).collect(),
            has_documents: !input.documents.is_empty(),
            has_codes: input.has_codes(),
            run_llm_rules: config.run_llm_rules && input.run_llm_rules,
            run_forensics: config.run_forensics && input.run_forensics,
        };

        let mut reasons = HashMap::new();
        let mut consider = |rule_id: &str, reason: Option<&'static str>| {
            if let Some(reason) = reason {
                reasons.insert(rule_id.to_string(), reason.to_string());
            }
        };

        for processor in registry.document_processors() {
            let reason = selection.reason(Phase::DocumentProcessing, processor.as_ref());
            consider(processor.rule_id(), reason);
        }
        for extractor in registry.code_extractors() {
            let reason = selection.reason(Phase::DataExtraction, extractor.as_ref());
            consider(extractor.rule_id(), reason);
        }
        for phase in Phase::CONCURRENT {
            for rule in registry.rules_for(phase) {
                consider(rule.rule_id(), selection.reason(phase, rule.as_ref()));
            }
        }

        Self { reasons }
    }

    /// Why a rule is skipped, if it is
    #[must_use]
    pub fn reason(&self, rule_id: &str) -> Option<&str> {
        self.reasons.get(rule_id).map(String::as_str)
    }

    /// Whether a rule is skipped
    #[must_use]
    pub fn contains(&self, rule_id: &str) -> bool {
        self.reasons.contains_key(rule_id)
    }

    /// Number of skipped rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    /// Whether every rule runs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}
