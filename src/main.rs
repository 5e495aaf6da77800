//! Claimcheck CLI
//!
//! Offline tooling for the claim validation engine: configuration checks and
//! re-scoring of recorded rule outcomes.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    cli.execute().await
}

/// Initialize logging from the verbosity flags. `RUST_LOG` takes precedence.
fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let config = claimcheck_telemetry::LoggingConfig::new()
        .with_level(level)
        .with_json(json)
        .with_file(verbose > 2);

    if let Err(e) = claimcheck_telemetry::init_logging(&config) {
        eprintln!("logging disabled: {e}");
    }
}
