//! Output formatting utilities for the CLI.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Create an output format from a JSON flag.
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Print a value as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section header.
pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Print a key-value pair.
pub fn key_value(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {value}", key.bold());
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

/// Print an issue that blocks approval.
pub fn issue(message: &str) {
    println!("  {} {message}", "✗".red().bold());
}

/// Print a warning line.
pub fn warning(message: &str) {
    println!("  {} {message}", "⚠".yellow().bold());
}

/// Render rows as a table.
pub fn render_table<T: tabled::Tabled>(rows: &[T]) -> String {
    use tabled::{settings::Style, Table};

    if rows.is_empty() {
        return "  (none)".to_string();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print rows as a table.
pub fn table<T: tabled::Tabled>(rows: &[T]) {
    println!("{}", render_table(rows));
}
