//! Check-config command - load and validate a configuration file.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::output::{self, OutputFormat};

/// Arguments for the check-config command.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file (YAML or TOML)
    pub file: PathBuf,
}

/// Execute the check-config command.
pub async fn execute(args: CheckConfigArgs, json: bool) -> Result<()> {
    let config = claimcheck_config::load_config(&args.file)
        .await
        .with_context(|| format!("invalid configuration in {}", args.file.display()))?;

    tracing::info!(file = %args.file.display(), "Configuration loaded");

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => output::json(&config),
        OutputFormat::Text => {
            output::success(&format!("{} is valid", args.file.display()));
            output::section("Effective settings");
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}
