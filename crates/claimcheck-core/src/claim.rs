//! Claim input and the per-run claim context.

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A document attached to a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDocument {
    /// Document identifier
    pub id: String,
    /// MIME type (e.g. `application/pdf`)
    pub mime_type: String,
    /// Original file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Raw or pre-extracted textual content
    #[serde(default)]
    pub content: String,
}

impl ClaimDocument {
    /// Create a new document
    #[must_use]
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            filename: None,
            content: content.into(),
        }
    }
}

/// Demographic and billing facts about a claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimMetadata {
    /// Patient age in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<u32>,
    /// Patient gender as recorded on the claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_gender: Option<String>,
    /// Billed amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_amount: Option<f64>,
    /// Date of service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date: Option<NaiveDate>,
    /// Payer identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    /// Rendering provider NPI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_npi: Option<String>,
}

/// Entry point input of a comprehensive validation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimValidationInput {
    /// Claim identifier
    pub claim_id: String,
    /// Tenant that owns the claim
    pub tenant_id: String,
    /// Pre-extracted ICD-10 diagnosis codes
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    /// Pre-extracted CPT/HCPCS procedure codes
    #[serde(default)]
    pub procedure_codes: Vec<String>,
    /// Attached documents
    #[serde(default)]
    pub documents: Vec<ClaimDocument>,
    /// Claim metadata
    #[serde(default)]
    pub metadata: ClaimMetadata,
    /// Rule ids the caller wants skipped
    #[serde(default)]
    pub skip_rules: Vec<String>,
    /// Run rules that call a language model
    #[serde(default = "default_true")]
    pub run_llm_rules: bool,
    /// Run forensic rules
    #[serde(default = "default_true")]
    pub run_forensics: bool,
}

fn default_true() -> bool {
    true
}

impl ClaimValidationInput {
    /// Create an input with no codes, documents or skips, and all rule families enabled
    #[must_use]
    pub fn new(claim_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            claim_id: claim_id.into(),
            tenant_id: tenant_id.into(),
            diagnosis_codes: Vec::new(),
            procedure_codes: Vec::new(),
            documents: Vec::new(),
            metadata: ClaimMetadata::default(),
            skip_rules: Vec::new(),
            run_llm_rules: true,
            run_forensics: true,
        }
    }

    /// Set pre-extracted codes
    #[must_use]
    pub fn with_codes<D, P>(mut self, diagnosis: D, procedures: P) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        self.diagnosis_codes = diagnosis.into_iter().map(Into::into).collect();
        self.procedure_codes = procedures.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a document
    #[must_use]
    pub fn with_document(mut self, document: ClaimDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Set claim metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: ClaimMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Ask for a rule to be skipped
    #[must_use]
    pub fn skip_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.skip_rules.push(rule_id.into());
        self
    }

    /// Enable or disable language-model rules
    #[must_use]
    pub fn with_llm_rules(mut self, enabled: bool) -> Self {
        self.run_llm_rules = enabled;
        self
    }

    /// Enable or disable forensic rules
    #[must_use]
    pub fn with_forensics(mut self, enabled: bool) -> Self {
        self.run_forensics = enabled;
        self
    }

    /// Whether the caller supplied both diagnosis and procedure codes
    #[must_use]
    pub fn has_codes(&self) -> bool {
        !self.diagnosis_codes.is_empty() && !self.procedure_codes.is_empty()
    }

    /// Validate the input
    ///
    /// # Errors
    /// Returns error if an identifier is blank
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.claim_id.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "claim_id cannot be empty".to_string(),
            ));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "tenant_id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only view of a claim handed to rule executors.
///
/// Built from the input at the start of a run; phase 1 appends document text
/// and phase 2 may replace or merge the codes before later phases see it.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimContext {
    /// Identifier of the validation run
    pub validation_id: String,
    /// Claim identifier
    pub claim_id: String,
    /// Tenant identifier
    pub tenant_id: String,
    /// Effective diagnosis codes
    pub diagnosis_codes: Vec<String>,
    /// Effective procedure codes
    pub procedure_codes: Vec<String>,
    /// Attached documents
    pub documents: Vec<ClaimDocument>,
    /// Text produced by document processing
    pub document_text: Vec<String>,
    /// Claim metadata
    pub metadata: ClaimMetadata,
}

impl ClaimContext {
    /// Build the initial context of a run
    #[must_use]
    pub fn from_input(input: &ClaimValidationInput, validation_id: impl Into<String>) -> Self {
        Self {
            validation_id: validation_id.into(),
            claim_id: input.claim_id.clone(),
            tenant_id: input.tenant_id.clone(),
            diagnosis_codes: input.diagnosis_codes.clone(),
            procedure_codes: input.procedure_codes.clone(),
            documents: input.documents.clone(),
            document_text: Vec::new(),
            metadata: input.metadata.clone(),
        }
    }

    /// Whether any documents are attached
    #[must_use]
    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// All text known for the claim: processed text when available, raw content otherwise
    #[must_use]
    pub fn combined_text(&self) -> String {
        if self.document_text.is_empty() {
            self.documents
                .iter()
                .map(|d| d.content.as_str())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n")
        } else {
            self.document_text.join("\n\n")
        }
    }

    /// Fold extracted codes into the context.
    ///
    /// A category the caller left empty is replaced; a supplied category is
    /// extended with codes it does not contain yet.
    pub fn merge_codes(&mut self, diagnosis: &[String], procedures: &[String]) {
        merge_into(&mut self.diagnosis_codes, diagnosis);
        merge_into(&mut self.procedure_codes, procedures);
    }
}

fn merge_into(target: &mut Vec<String>, extracted: &[String]) {
    for code in extracted {
        let code = code.trim();
        if !code.is_empty() && !target.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            target.push(code.to_string());
        }
    }
}
