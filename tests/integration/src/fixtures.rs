//! Test fixtures and sample data for integration tests

use claimcheck_core::{ClaimDocument, ClaimMetadata, ClaimValidationInput, Phase};
use claimcheck_pipeline::{ExtractionResponse, RuleRegistry};
use std::sync::Arc;

use crate::mock_rules::MockRule;

/// Office-visit claim for type 2 diabetes with codes supplied by the submitter
pub fn diabetes_office_visit() -> ClaimValidationInput {
    ClaimValidationInput::new("CLM-2024-0001", "tenant-acme")
        .with_codes(["E11.9"], ["99213"])
        .with_metadata(ClaimMetadata {
            patient_age: Some(58),
            patient_gender: Some("F".to_string()),
            billed_amount: Some(145.0),
            ..ClaimMetadata::default()
        })
}

/// Claim carrying only a clinical note; codes must be extracted
pub fn claim_with_clinical_note() -> ClaimValidationInput {
    ClaimValidationInput::new("CLM-2024-0002", "tenant-acme").with_document(ClaimDocument::new(
        "note-1",
        "text/plain",
        "Established patient seen for type 2 diabetes without complications. \
         A1c stable on metformin. 15 minute office visit.",
    ))
}

/// Claim with nothing to validate against
pub fn bare_claim(claim_id: &str) -> ClaimValidationInput {
    ClaimValidationInput::new(claim_id, "tenant-acme").with_codes(["Z00.00"], ["99395"])
}

/// Extraction reply for the diabetes office visit
pub fn diabetes_codes(confidence: Option<f64>) -> ExtractionResponse {
    ExtractionResponse {
        diagnosis_codes: vec!["E11.9".to_string()],
        procedure_codes: vec!["99213".to_string()],
        confidence,
    }
}

/// Register one rule per concurrent phase, all passing, and return them
pub fn register_passing_rules(registry: &mut RuleRegistry) -> Vec<Arc<MockRule>> {
    let rules = [
        (Phase::FraudDetection, "fraud_detection"),
        (Phase::MedicalValidation, "medical_necessity"),
        (Phase::DocumentationCheck, "documentation"),
        (Phase::CoverageValidation, "coverage"),
    ];
    rules
        .into_iter()
        .map(|(phase, id)| {
            let rule = MockRule::passing(id);
            registry
                .register_rule(phase, rule.clone())
                .expect("unique rule id");
            rule
        })
        .collect()
}
