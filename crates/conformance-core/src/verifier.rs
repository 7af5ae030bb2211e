//! Run driver: one verification per submission, plus batch sweeps.

use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::aggregate;
use crate::config::VerifierConfig;
use crate::domain::{ReleaseVersion, Result, Submission, Verdict, VerifyError};
use crate::metrics::METRICS;
use crate::obs::{self, VerificationSpan};
use crate::requirements::RequirementResolver;
use crate::rules::{self, compile_script, CompiledScript, RuleContext, RunRecord, StepRegistry};

/// Result of verifying one submission.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    /// The submission with derived metadata filled in.
    pub submission: Submission,
    pub run: RunRecord,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSubmission {
    pub id: u64,
    pub error: String,
}

/// Outcome of a sweep over many submissions.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub verified: Vec<Verification>,
    pub skipped: Vec<SkippedSubmission>,
}

/// Compiled rules plus the release window. Shareable across workers.
#[derive(Debug)]
pub struct Verifier {
    resolver: RequirementResolver,
    script: CompiledScript,
    latest_release: String,
    lookback: u64,
}

impl Verifier {
    pub fn new(
        resolver: RequirementResolver,
        script: CompiledScript,
        latest_release: impl Into<String>,
        lookback: u64,
    ) -> Self {
        Self {
            resolver,
            script,
            latest_release: latest_release.into(),
            lookback,
        }
    }

    /// Verifier running the embedded rule script.
    pub fn with_default_rules(
        resolver: RequirementResolver,
        latest_release: impl Into<String>,
        lookback: u64,
    ) -> Result<Self> {
        let script = compile_script(rules::DEFAULT_RULES, &StepRegistry::standard())?;
        Ok(Self::new(resolver, script, latest_release, lookback))
    }

    /// Build from configuration, loading the rule script from disk if set.
    pub fn from_config(config: &VerifierConfig) -> anyhow::Result<Self> {
        let resolver = RequirementResolver::new(config.metadata_root());
        let script = match config.rules_script() {
            Some(path) => {
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading rule script {}", path.display()))?;
                compile_script(&source, &StepRegistry::standard())
                    .with_context(|| format!("compiling rule script {}", path.display()))?
            }
            None => compile_script(rules::DEFAULT_RULES, &StepRegistry::standard())
                .context("compiling embedded rule script")?,
        };
        Ok(Self::new(
            resolver,
            script,
            config.release.latest.clone(),
            config.release.lookback,
        ))
    }

    pub fn resolver(&self) -> &RequirementResolver {
        &self.resolver
    }

    pub fn script(&self) -> &CompiledScript {
        &self.script
    }

    pub fn latest_release(&self) -> &str {
        &self.latest_release
    }

    /// Refresh the latest known release between runs.
    pub fn set_latest_release(&mut self, latest: impl Into<String>) {
        self.latest_release = latest.into();
    }

    /// Whether `target` is at or beyond the latest known release.
    fn at_or_beyond_latest(&self, target: &str) -> bool {
        match (
            ReleaseVersion::parse(target),
            ReleaseVersion::parse(&self.latest_release),
        ) {
            (Ok(target), Ok(latest)) => target >= latest,
            _ => false,
        }
    }

    /// Load the target's manifest before running rules.
    ///
    /// The records are kept in the context for the evidence steps. An
    /// unpublished manifest for a release at or beyond the latest marks the
    /// run pending. A corrupt manifest aborts the verification.
    fn preflight(&self, ctx: &mut RuleContext<'_>) -> Result<()> {
        let target = ctx.target_version();
        if target.is_empty() {
            return Ok(());
        }
        match self.resolver.load_manifest(target) {
            Ok(records) => {
                ctx.set_manifest(records);
                Ok(())
            }
            Err(VerifyError::MetadataUnavailable { .. }) => {
                if self.at_or_beyond_latest(target) {
                    debug!(version = %target, "requirements not yet published");
                    ctx.mark_requirements_pending();
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verify one submission.
    ///
    /// # Errors
    ///
    /// Only [`VerifyError::MetadataCorrupt`] aborts; every other problem is
    /// reported through the verdict.
    pub fn verify(&self, mut submission: Submission) -> Result<Verification> {
        let _span = VerificationSpan::enter(submission.id);
        let started = Instant::now();
        obs::emit_verification_started(submission.id, &submission.title);

        submission.derive_metadata();

        let (run, verdict) = {
            let mut ctx =
                RuleContext::new(&submission, &self.resolver, &self.latest_release, self.lookback);
            self.preflight(&mut ctx)?;
            let run = rules::run(&self.script, &mut ctx);
            let verdict = aggregate(&run, &ctx);
            (run, verdict)
        };

        for scenario in run.scenarios.iter().filter(|s| s.failed()) {
            obs::emit_scenario_failed(
                submission.id,
                &scenario.name,
                scenario.first_failure().unwrap_or_default(),
            );
        }

        METRICS.record_verdict(verdict.state);
        obs::emit_verification_finished(
            submission.id,
            verdict.state.as_str(),
            verdict.labels.len(),
            run.failed_scenarios(),
            started.elapsed().as_millis() as u64,
        );

        Ok(Verification {
            submission,
            run,
            verdict,
        })
    }
}

/// Verify every submission, skipping (and logging) those that error, then
/// flush [`METRICS`].
pub fn verify_all<I>(verifier: &Verifier, submissions: I) -> SweepReport
where
    I: IntoIterator<Item = Submission>,
{
    let report = verify_batch(verifier, submissions);
    METRICS.flush();
    report
}

/// [`verify_all`] without the metrics flush, for one worker's share of a
/// larger sweep.
pub fn verify_batch<I>(verifier: &Verifier, submissions: I) -> SweepReport
where
    I: IntoIterator<Item = Submission>,
{
    let mut report = SweepReport::default();
    for submission in submissions {
        let id = submission.id;
        match verifier.verify(submission) {
            Ok(verification) => report.verified.push(verification),
            Err(e) => {
                obs::emit_verification_skipped(id, &e);
                METRICS.inc_skipped();
                report.skipped.push(SkippedSubmission {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
    report
}
