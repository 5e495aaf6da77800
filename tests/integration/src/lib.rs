//! Integration tests for the claimcheck validation engine
//!
//! This crate provides integration tests covering:
//! - Gateway retry, circuit breaking and failover
//! - Orchestrator fault isolation and decision monotonicity
//! - End-to-end claim scenarios through extraction, scoring and decision

pub mod fixtures;
pub mod helpers;
pub mod mock_providers;
pub mod mock_rules;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_providers::*;
pub use mock_rules::*;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod gateway_tests;
#[cfg(test)]
mod scenario_tests;
