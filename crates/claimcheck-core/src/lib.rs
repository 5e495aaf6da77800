//! # Claimcheck Core
//!
//! Core types, traits, and error handling for the claimcheck validation engine.
//!
//! This crate provides the foundational types used throughout the engine:
//! - The provider abstraction consumed by the resilient gateway
//! - Claim input and the per-run claim context handed to rules
//! - Rule outcomes and the rule executor traits
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claim;
pub mod error;
pub mod outcome;
pub mod provider;
pub mod rule;

// Re-export commonly used types
pub use claim::{ClaimContext, ClaimDocument, ClaimMetadata, ClaimValidationInput};
pub use error::{
    GatewayError, ProviderError, ProviderErrorKind, ProviderResult, RuleError, ValidationError,
};
pub use outcome::{RuleOutcome, RuleStatus};
pub use provider::{HasConfidence, Provider};
pub use rule::{
    CodeExtractor, DocumentProcessor, ExtractedCodes, Phase, ProcessedDocuments, RuleExecutor,
    RuleIdentity,
};
