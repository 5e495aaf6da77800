//! Gateway-backed code extraction.
//!
//! [`LlmCodeExtractor`] sends the claim's document text to a language model
//! behind a [`ResilientGateway`] and turns the reply into a phase 2 outcome.
//! A gateway that exhausts every provider surfaces as a [`RuleError`], which
//! the orchestrator downgrades to a warning.

use async_trait::async_trait;
use claimcheck_core::{
    ClaimContext, CodeExtractor, ExtractedCodes, HasConfidence, RuleError, RuleIdentity,
    RuleOutcome,
};
use claimcheck_resilience::ResilientGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Request sent to an extraction provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Claim identifier
    pub claim_id: String,
    /// Document text to extract codes from
    pub text: String,
    /// Diagnosis codes already on the claim
    pub known_diagnosis_codes: Vec<String>,
    /// Procedure codes already on the claim
    pub known_procedure_codes: Vec<String>,
}

impl ExtractionRequest {
    /// Build a request from the claim context
    #[must_use]
    pub fn from_context(ctx: &ClaimContext) -> Self {
        Self {
            claim_id: ctx.claim_id.clone(),
            text: ctx.combined_text(),
            known_diagnosis_codes: ctx.diagnosis_codes.clone(),
            known_procedure_codes: ctx.procedure_codes.clone(),
        }
    }
}

/// Reply of an extraction provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    /// Extracted ICD-10 codes
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    /// Extracted CPT/HCPCS codes
    #[serde(default)]
    pub procedure_codes: Vec<String>,
    /// Model confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl HasConfidence for ExtractionResponse {
    fn confidence(&self) -> Option<f64> {
        self.confidence
    }
}

/// Gateway used for extraction
pub type ExtractionGateway = ResilientGateway<ExtractionRequest, ExtractionResponse>;

/// Phase 2 extractor calling a language model through a resilient gateway
#[derive(Debug, Clone)]
pub struct LlmCodeExtractor {
    rule_id: String,
    rule_name: String,
    gateway: Arc<ExtractionGateway>,
}

impl LlmCodeExtractor {
    /// Create an extractor with the `code_extraction` rule id
    #[must_use]
    pub fn new(gateway: Arc<ExtractionGateway>) -> Self {
        Self {
            rule_id: "code_extraction".to_string(),
            rule_name: "LLM Code Extraction".to_string(),
            gateway,
        }
    }

    /// Override the rule id and name
    #[must_use]
    pub fn with_identity(mut self, rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        self.rule_id = rule_id.into();
        self.rule_name = rule_name.into();
        self
    }
}

impl RuleIdentity for LlmCodeExtractor {
    fn rule_id(&self) -> &str {
        &self.rule_id
    }

    fn rule_name(&self) -> &str {
        &self.rule_name
    }

    fn uses_llm(&self) -> bool {
        true
    }
}

#[async_trait]
impl CodeExtractor for LlmCodeExtractor {
    async fn extract(&self, ctx: &ClaimContext) -> Result<ExtractedCodes, RuleError> {
        let request = ExtractionRequest::from_context(ctx);
        if request.text.trim().is_empty() {
            return Ok(ExtractedCodes {
                outcome: RuleOutcome::warning(
                    &self.rule_id,
                    &self.rule_name,
                    DEFAULT_CONFIDENCE,
                    "no document text to extract codes from",
                ),
                diagnosis_codes: Vec::new(),
                procedure_codes: Vec::new(),
            });
        }

        let result = self.gateway.execute(&request).await;
        let provider = result.provider_used.clone();
        let fallback_used = result.fallback_used;
        let latency_ms = result.latency_ms;
        let confidence = result.confidence.unwrap_or(DEFAULT_CONFIDENCE);

        let response = result
            .into_result()
            .map_err(|e| RuleError::gateway(&self.rule_id, e))?;

        debug!(
            rule_id = %self.rule_id,
            provider = ?provider,
            fallback_used = fallback_used,
            diagnosis = response.diagnosis_codes.len(),
            procedures = response.procedure_codes.len(),
            "Extraction response received"
        );

        let outcome = if response.diagnosis_codes.is_empty() && response.procedure_codes.is_empty() {
            RuleOutcome::warning(&self.rule_id, &self.rule_name, confidence, "no codes extracted")
        } else {
            RuleOutcome::passed(&self.rule_id, &self.rule_name, confidence)
        };
        let outcome = outcome
            .with_detail("provider", &provider)
            .with_detail("fallback_used", fallback_used)
            .with_detail("gateway_latency_ms", latency_ms);

        Ok(ExtractedCodes {
            outcome,
            diagnosis_codes: response.diagnosis_codes,
            procedure_codes: response.procedure_codes,
        })
    }
}
