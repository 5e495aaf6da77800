//! CLI commands module.

pub mod check_config;
pub mod score;
