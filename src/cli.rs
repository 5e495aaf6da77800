//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Claimcheck - resilient multi-provider claim validation
#[derive(Parser, Debug)]
#[command(name = "claimcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a configuration file, then print the effective settings
    #[command(name = "check-config")]
    CheckConfig(commands::check_config::CheckConfigArgs),

    /// Score recorded rule outcomes and print the risk assessment and decision
    Score(commands::score::ScoreArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::CheckConfig(args) => commands::check_config::execute(args, self.json).await,
            Commands::Score(args) => commands::score::execute(args, self.json).await,
        }
    }
}
