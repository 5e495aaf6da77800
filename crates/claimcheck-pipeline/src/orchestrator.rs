//! Validation orchestrator.
//!
//! Runs the seven-phase pipeline over one claim:
//!
//! 1. document processing, sequential and best-effort
//! 2. code extraction, sequential; extracted codes feed later phases
//! 3. to 6. fraud, medical, documentation and coverage rules, all launched
//!    together with every rule in its own task
//! 7. aggregation, risk scoring and the decision
//!
//! An executor that errors, panics or times out becomes an outcome with
//! status `error` plus a warning; it never cancels or corrupts its siblings.
//! Only aggregation can fail a run.

use crate::decision::decide;
use crate::registry::RuleRegistry;
use crate::result::{
    critical_issues, rule_warnings, summarize, ComprehensiveValidationResult, PhaseTiming,
};
use crate::risk::RiskScorer;
use crate::skip::SkipSet;
use chrono::{DateTime, Utc};
use claimcheck_core::{
    ClaimContext, ClaimValidationInput, Phase, RuleError, RuleExecutor, RuleIdentity, RuleOutcome,
    ValidationError,
};
use claimcheck_telemetry::{
    AuditEventBuilder, AuditEventType, AuditLogger, AuditResource, AuditSeverity, Metrics,
};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Process-wide switch for language-model rules
    pub run_llm_rules: bool,
    /// Process-wide switch for forensic rules
    pub run_forensics: bool,
    /// Budget of a single executor
    pub rule_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            run_llm_rules: true,
            run_forensics: true,
            rule_timeout: None,
        }
    }
}

impl OrchestratorConfig {
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

    /// Set the per-executor timeout
    #[must_use]
    pub fn with_rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout = Some(timeout);
        self
    }
}

/// Accumulators of one run
#[derive(Default)]
struct RunState {
    outcomes: Vec<RuleOutcome>,
    warnings: Vec<String>,
    timings: Vec<PhaseTiming>,
}

/// Work item of a concurrent phase
enum Plan {
    Skip(RuleOutcome),
    Run(Arc<dyn RuleExecutor>),
}

struct PhaseReport {
    outcomes: Vec<RuleOutcome>,
    warnings: Vec<String>,
    elapsed: Duration,
}

/// Runs the validation pipeline over claims
#[derive(Debug)]
pub struct ValidationOrchestrator {
    registry: RuleRegistry,
    scorer: RiskScorer,
    config: OrchestratorConfig,
    metrics: Option<Arc<Metrics>>,
    audit: Option<Arc<AuditLogger>>,
}

impl ValidationOrchestrator {
    /// Create an orchestrator with the default scorer and configuration
    #[must_use]
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            scorer: RiskScorer::new(),
            config: OrchestratorConfig::default(),
            metrics: None,
            audit: None,
        }
    }

    /// Set the risk scorer
    #[must_use]
    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Record run metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Emit one audit event per run
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Registered executors
    #[must_use]
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Risk scorer
    #[must_use]
    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validate a claim through every phase.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidInput`] for a claim without ids and
    /// [`ValidationError::Aggregation`] if the outcomes cannot be reconciled
    /// with the registered rules. Executor failures are never errors.
    pub async fn validate_comprehensive(
        &self,
        input: ClaimValidationInput,
    ) -> Result<ComprehensiveValidationResult, ValidationError> {
        let validation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "validate_claim",
            claim_id = %input.claim_id,
            tenant_id = %input.tenant_id,
            validation_id = %validation_id,
        );

        let result = self
            .run(&input, validation_id.clone())
            .instrument(span)
            .await;

        match &result {
            Ok(result) => self.record_completed(result).await,
            Err(error) => self.record_failed(&input, &validation_id, error).await,
        }
        result
    }

    async fn run(
        &self,
        input: &ClaimValidationInput,
        validation_id: String,
    ) -> Result<ComprehensiveValidationResult, ValidationError> {
        input.validate()?;

        let started_at = Utc::now();
        let start = Instant::now();
        let skips = SkipSet::compute(&self.registry, input, &self.config);
        let mut ctx = ClaimContext::from_input(input, validation_id);
        let mut state = RunState {
            outcomes: Vec::with_capacity(self.registry.rule_count()),
            ..RunState::default()
        };

        info!(
            rules = self.registry.rule_count(),
            skipped = skips.len(),
            documents = input.documents.len(),
            "Validation started"
        );

        self.process_documents(&mut ctx, &skips, &mut state)
            .instrument(info_span!("phase", phase = %Phase::DocumentProcessing))
            .await;

        self.extract_codes(&mut ctx, &skips, &mut state)
            .instrument(info_span!("phase", phase = %Phase::DataExtraction))
            .await;

        let ctx = Arc::new(ctx);
        self.run_concurrent_phases(&ctx, &skips, &mut state).await;

        self.aggregate(&ctx, state, started_at, start)
    }

    /// Phase 1
    async fn process_documents(
        &self,
        ctx: &mut ClaimContext,
        skips: &SkipSet,
        state: &mut RunState,
    ) {
        let phase = Phase::DocumentProcessing;
        let phase_start = Instant::now();

        for processor in self.registry.document_processors() {
            if let Some(reason) = skips.reason(processor.rule_id()) {
                state.outcomes.push(RuleOutcome::skipped(
                    processor.rule_id(),
                    processor.rule_name(),
                    reason,
                ));
                continue;
            }

            let started = Instant::now();
            let snapshot = Arc::new(ctx.clone());
            let task = {
                let processor = Arc::clone(processor);
                async move { processor.process(&snapshot).await }
            };

            match run_isolated(processor.rule_id(), self.config.rule_timeout, task).await {
                Ok(processed) => {
                    debug!(
                        rule_id = %processor.rule_id(),
                        pages = processed.text.len(),
                        "Documents processed"
                    );
                    ctx.document_text.extend(processed.text);
                    state.outcomes.push(with_elapsed(processed.outcome, started));
                }
                Err(error) => {
                    let (outcome, warning) = failure(phase, processor.as_ref(), &error, started);
                    state.outcomes.push(outcome);
                    state.warnings.push(warning);
                }
            }
        }

        state.timings.push(PhaseTiming::new(phase, phase_start.elapsed()));
    }

    /// Phase 2
    async fn extract_codes(&self, ctx: &mut ClaimContext, skips: &SkipSet, state: &mut RunState) {
        let phase = Phase::DataExtraction;
        let phase_start = Instant::now();

        for extractor in self.registry.code_extractors() {
            if let Some(reason) = skips.reason(extractor.rule_id()) {
                state.outcomes.push(RuleOutcome::skipped(
                    extractor.rule_id(),
                    extractor.rule_name(),
                    reason,
                ));
                continue;
            }

            let started = Instant::now();
            let snapshot = Arc::new(ctx.clone());
            let task = {
                let extractor = Arc::clone(extractor);
                async move { extractor.extract(&snapshot).await }
            };

            match run_isolated(extractor.rule_id(), self.config.rule_timeout, task).await {
                Ok(extracted) => {
                    debug!(
                        rule_id = %extractor.rule_id(),
                        diagnosis = extracted.diagnosis_codes.len(),
                        procedures = extracted.procedure_codes.len(),
                        "Codes extracted"
                    );
                    ctx.merge_codes(&extracted.diagnosis_codes, &extracted.procedure_codes);
                    state.outcomes.push(with_elapsed(extracted.outcome, started));
                }
                Err(error) => {
                    let (outcome, warning) = failure(phase, extractor.as_ref(), &error, started);
                    state.outcomes.push(outcome);
                    state.warnings.push(warning);
                }
            }
        }

        state.timings.push(PhaseTiming::new(phase, phase_start.elapsed()));
    }

    /// Phases 3 to 6, each in its own task, joined before aggregation
    async fn run_concurrent_phases(
        &self,
        ctx: &Arc<ClaimContext>,
        skips: &SkipSet,
        state: &mut RunState,
    ) {
        let mut launched = Vec::with_capacity(Phase::CONCURRENT.len());

        for phase in Phase::CONCURRENT {
            let rules = self.registry.rules_for(phase);
            if rules.is_empty() {
                continue;
            }

            let identities: Vec<(String, String)> = rules
                .iter()
                .map(|r| (r.rule_id().to_string(), r.rule_name().to_string()))
                .collect();
            let plans: Vec<Plan> = rules
                .iter()
                .map(|rule| match skips.reason(rule.rule_id()) {
                    Some(reason) => {
                        Plan::Skip(RuleOutcome::skipped(rule.rule_id(), rule.rule_name(), reason))
                    }
                    None => Plan::Run(Arc::clone(rule)),
                })
                .collect();

            let handle = tokio::spawn(
                run_phase(phase, plans, Arc::clone(ctx), self.config.rule_timeout)
                    .instrument(info_span!("phase", phase = %phase)),
            );
            launched.push((phase, identities, handle));
        }

        let joined = join_all(
            launched
                .into_iter()
                .map(|(phase, identities, handle)| async move { (phase, identities, handle.await) }),
        )
        .await;

        for (phase, identities, result) in joined {
            match result {
                Ok(report) => {
                    state.outcomes.extend(report.outcomes);
                    state.warnings.extend(report.warnings);
                    state.timings.push(PhaseTiming::new(phase, report.elapsed));
                }
                Err(error) => {
                    warn!(phase = %phase, error = %error, "Phase task failed");
                    state.warnings.push(format!("{phase}: phase task failed: {error}"));
                    state.outcomes.extend(identities.into_iter().map(|(id, name)| {
                        RuleOutcome::error(id, name, format!("phase {phase} failed: {error}"))
                    }));
                    state.timings.push(PhaseTiming::new(phase, Duration::ZERO));
                }
            }
        }
    }

    /// Phase 7
    fn aggregate(
        &self,
        ctx: &ClaimContext,
        state: RunState,
        started_at: DateTime<Utc>,
        start: Instant,
    ) -> Result<ComprehensiveValidationResult, ValidationError> {
        let phase_start = Instant::now();
        let RunState {
            outcomes,
            mut warnings,
            mut timings,
        } = state;

        let expected = self.registry.rule_count();
        if outcomes.len() != expected {
            return Err(ValidationError::Aggregation(format!(
                "expected {expected} rule outcomes, got {}",
                outcomes.len()
            )));
        }

        let summary = summarize(&outcomes);

        let critical_issues = critical_issues(&outcomes);
        warnings.extend(rule_warnings(&outcomes));

        let risk_assessment = self
            .scorer
            .calculate_risk(&outcomes, &critical_issues, &warnings);
        let decision = decide(
            summary.failed,
            critical_issues.len(),
            risk_assessment.risk_level,
            summary.overall_confidence,
        );

        timings.push(PhaseTiming::new(Phase::Aggregation, phase_start.elapsed()));
        let total_time_ms = start.elapsed().as_millis() as u64;

        info!(
            decision = %decision,
            risk_score = risk_assessment.risk_score,
            risk_level = %risk_assessment.risk_level,
            passed = summary.passed,
            failed = summary.failed,
            warned = summary.warned,
            skipped = summary.skipped,
            errored = summary.errored,
            total_time_ms = total_time_ms,
            "Validation completed"
        );

        Ok(ComprehensiveValidationResult {
            validation_id: ctx.validation_id.clone(),
            claim_id: ctx.claim_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            decision,
            overall_confidence: summary.overall_confidence,
            rules_passed: summary.passed,
            rules_failed: summary.failed,
            rules_warned: summary.warned,
            rules_skipped: summary.skipped,
            rules_errored: summary.errored,
            total_issues: summary.total_issues,
            outcomes,
            critical_issues,
            warnings,
            risk_assessment,
            diagnosis_codes: ctx.diagnosis_codes.clone(),
            procedure_codes: ctx.procedure_codes.clone(),
            phase_timings: timings,
            started_at,
            completed_at: Utc::now(),
            total_time_ms,
        })
    }

    async fn record_completed(&self, result: &ComprehensiveValidationResult) {
        if let Some(metrics) = &self.metrics {
            metrics.record_validation(
                result.decision.as_str(),
                Duration::from_millis(result.total_time_ms),
                result.risk_assessment.risk_score,
            );
            for outcome in &result.outcomes {
                metrics.record_rule(outcome.status.as_str());
            }
        }

        let Some(audit) = &self.audit else {
            return;
        };
        let severity = if result.is_approved() {
            AuditSeverity::Info
        } else {
            AuditSeverity::Warning
        };
        let event = AuditEventBuilder::new(AuditEventType::ValidationCompleted)
            .severity(severity)
            .resource(AuditResource::new("claim", &result.claim_id))
            .description(format!(
                "Claim {} validated: {}",
                result.claim_id, result.decision
            ))
            .metadata("decision", result.decision.as_str())
            .metadata("risk_score", result.risk_assessment.risk_score)
            .metadata("risk_level", result.risk_assessment.risk_level.as_str())
            .metadata("rules_passed", result.rules_passed)
            .metadata("rules_failed", result.rules_failed)
            .metadata("rules_errored", result.rules_errored)
            .metadata("critical_issues", result.critical_issues.len())
            .correlation_id(&result.validation_id)
            .tenant_id(&result.tenant_id)
            .build();
        if let Err(e) = audit.log(event).await {
            warn!(error = %e, "Audit event not recorded");
        }
    }

    async fn record_failed(
        &self,
        input: &ClaimValidationInput,
        validation_id: &str,
        error: &ValidationError,
    ) {
        warn!(claim_id = %input.claim_id, error = %error, "Validation failed");

        let Some(audit) = &self.audit else {
            return;
        };
        let event = AuditEventBuilder::new(AuditEventType::ValidationFailed)
            .severity(AuditSeverity::Error)
            .resource(AuditResource::new("claim", &input.claim_id))
            .description(format!("Claim {} validation failed", input.claim_id))
            .metadata("error", error.to_string())
            .correlation_id(validation_id)
            .tenant_id(&input.tenant_id)
            .build();
        if let Err(e) = audit.log(event).await {
            warn!(error = %e, "Audit event not recorded");
        }
    }
}

/// One concurrent phase: every planned rule runs in its own task
async fn run_phase(
    phase: Phase,
    plans: Vec<Plan>,
    ctx: Arc<ClaimContext>,
    timeout: Option<Duration>,
) -> PhaseReport {
    let start = Instant::now();

    let results = join_all(plans.into_iter().map(|plan| {
        let ctx = Arc::clone(&ctx);
        async move {
            match plan {
                Plan::Skip(outcome) => (outcome, None),
                Plan::Run(rule) => execute_rule(phase, rule, ctx, timeout).await,
            }
        }
    }))
    .await;

    let mut outcomes = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for (outcome, warning) in results {
        outcomes.push(outcome);
        warnings.extend(warning);
    }

    let elapsed = start.elapsed();
    debug!(
        phase = %phase,
        rules = outcomes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Phase finished"
    );

    PhaseReport {
        outcomes,
        warnings,
        elapsed,
    }
}

async fn execute_rule(
    phase: Phase,
    rule: Arc<dyn RuleExecutor>,
    ctx: Arc<ClaimContext>,
    timeout: Option<Duration>,
) -> (RuleOutcome, Option<String>) {
    let started = Instant::now();
    let task = {
        let rule = Arc::clone(&rule);
        async move { rule.validate(&ctx).await }
    };

    match run_isolated(rule.rule_id(), timeout, task).await {
        Ok(outcome) => {
            debug!(
                rule_id = %rule.rule_id(),
                status = %outcome.status,
                confidence = outcome.confidence,
                "Rule finished"
            );
            (with_elapsed(outcome, started), None)
        }
        Err(error) => {
            let (outcome, warning) = failure(phase, rule.as_ref(), &error, started);
            (outcome, Some(warning))
        }
    }
}

/// Run an executor future in its own task so that a panic or a timeout is
/// contained to that executor
async fn run_isolated<T, Fut>(
    rule_id: &str,
    timeout: Option<Duration>,
    task: Fut,
) -> Result<T, RuleError>
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, RuleError>> + Send + 'static,
{
    let id = rule_id.to_string();
    let handle = tokio::spawn(async move {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .unwrap_or_else(|_| Err(RuleError::timeout(id, limit))),
            None => task.await,
        }
    });

    match handle.await {
        Ok(result) => result,
        Err(error) if error.is_panic() => {
            let payload = error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(RuleError::infrastructure(
                rule_id,
                format!("executor panicked: {message}"),
            ))
        }
        Err(error) => Err(RuleError::infrastructure(
            rule_id,
            format!("executor task failed: {error}"),
        )),
    }
}

fn with_elapsed(outcome: RuleOutcome, started: Instant) -> RuleOutcome {
    if outcome.execution_time_ms == 0 {
        outcome.with_execution_time_ms(started.elapsed().as_millis() as u64)
    } else {
        outcome
    }
}

fn failure<R: RuleIdentity + ?Sized>(
    phase: Phase,
    rule: &R,
    error: &RuleError,
    started: Instant,
) -> (RuleOutcome, String) {
    warn!(
        phase = %phase,
        rule_id = %rule.rule_id(),
        error = %error,
        "Rule execution failed"
    );
    let outcome = RuleOutcome::error(rule.rule_id(), rule.rule_name(), error.to_string())
        .with_execution_time_ms(started.elapsed().as_millis() as u64);
    let warning = format!("{phase}: {error}");
    (outcome, warning)
}
