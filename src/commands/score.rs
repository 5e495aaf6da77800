//! Score command - risk-score recorded rule outcomes.
//!
//! Accepts either a bare JSON array of rule outcomes or an object with
//! `outcomes` and optional `critical_issues` / `warnings`.

use anyhow::{Context, Result};
use clap::Args;
use claimcheck_core::RuleOutcome;
use claimcheck_pipeline::{
    critical_issues, decide, rule_warnings, summarize, OutcomeSummary, RiskAssessment,
    RiskScorer, ValidationDecision,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::output::{self, OutputFormat};

/// Arguments for the score command.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// JSON file with recorded rule outcomes
    pub file: PathBuf,

    /// Configuration file supplying risk weight overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedRun {
    Outcomes(Vec<RuleOutcome>),
    Run {
        outcomes: Vec<RuleOutcome>,
        #[serde(default)]
        critical_issues: Vec<String>,
        #[serde(default)]
        warnings: Vec<String>,
    },
}

/// Scored run
#[derive(Debug, Serialize)]
pub struct ScoreReport {
    pub decision: ValidationDecision,
    pub summary: OutcomeSummary,
    pub critical_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub risk_assessment: RiskAssessment,
}

/// Risk factor row for text output
#[derive(Debug, Tabled)]
struct FactorRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Category")]
    category: &'static str,
    #[tabled(rename = "Weighted")]
    weighted: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn factor_rows(risk: &RiskAssessment) -> Vec<FactorRow> {
    risk.factors
        .iter()
        .map(|factor| FactorRow {
            source: factor.source.clone(),
            category: factor.category.as_str(),
            weighted: format!("{:.3}", factor.weighted_score()),
            description: factor.description.clone(),
        })
        .collect()
}

fn score(run: RecordedRun, scorer: &RiskScorer) -> ScoreReport {
    let (outcomes, extra_critical, mut warnings) = match run {
        RecordedRun::Outcomes(outcomes) => (outcomes, Vec::new(), Vec::new()),
        RecordedRun::Run {
            outcomes,
            critical_issues,
            warnings,
        } => (outcomes, critical_issues, warnings),
    };

    let summary = summarize(&outcomes);
    let mut critical = critical_issues(&outcomes);
    for issue in extra_critical {
        if !critical.contains(&issue) {
            critical.push(issue);
        }
    }
    warnings.extend(rule_warnings(&outcomes));

    let risk_assessment = scorer.calculate_risk(&outcomes, &critical, &warnings);
    let decision = decide(
        summary.failed,
        critical.len(),
        risk_assessment.risk_level,
        summary.overall_confidence,
    );

    ScoreReport {
        decision,
        summary,
        critical_issues: critical,
        warnings,
        risk_assessment,
    }
}

async fn scorer(config: Option<&Path>) -> Result<RiskScorer> {
    let scorer = RiskScorer::new();
    match config {
        Some(path) => {
            let config = claimcheck_config::load_config(path)
                .await
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            Ok(scorer.with_weight_overrides(config.risk.weights))
        }
        None => Ok(scorer),
    }
}

/// Execute the score command.
pub async fn execute(args: ScoreArgs, json: bool) -> Result<()> {
    let scorer = scorer(args.config.as_deref()).await?;

    let contents = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let run: RecordedRun = serde_json::from_str(&contents)
        .with_context(|| format!("{} does not contain rule outcomes", args.file.display()))?;

    let report = score(run, &scorer);
    tracing::info!(
        decision = %report.decision,
        risk_score = report.risk_assessment.risk_score,
        outcomes = report.summary.total(),
        "Outcomes scored"
    );

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => output::json(&report),
        OutputFormat::Text => {
            print_report(&report);
            Ok(())
        }
    }
}

fn print_report(report: &ScoreReport) {
    let risk = &report.risk_assessment;

    output::section("Decision");
    output::key_value("Decision", report.decision);
    output::key_value("Overall confidence", format!("{:.2}", report.summary.overall_confidence));
    output::key_value(
        "Rules",
        format!(
            "{} passed, {} failed, {} warned, {} skipped, {} errored",
            report.summary.passed,
            report.summary.failed,
            report.summary.warned,
            report.summary.skipped,
            report.summary.errored
        ),
    );

    output::section("Risk assessment");
    output::key_value("Score", format!("{:.3}", risk.risk_score));
    output::key_value("Level", risk.risk_level);
    output::key_value(
        "Primary category",
        risk.primary_category.map_or("none", |c| c.as_str()),
    );
    output::key_value("Recommendation", &risk.recommendation);
    output::key_value("Compound multiplier", format!("{:.1}", risk.compound_multiplier));

    output::section("Risk factors");
    output::table(&factor_rows(risk));

    if !report.critical_issues.is_empty() {
        output::section("Critical issues");
        for issue in &report.critical_issues {
            output::issue(issue);
        }
    }
    if !report.warnings.is_empty() {
        output::section("Warnings");
        for warning in &report.warnings {
            output::warning(warning);
        }
    }
}
