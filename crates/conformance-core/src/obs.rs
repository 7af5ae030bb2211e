//! Structured lifecycle events for verification runs.
//!
//! Every verification runs inside a [`VerificationSpan`]; the `emit_*`
//! functions log one event each with a stable `event` field so log pipelines
//! can key on it.

use tracing::{info, warn};
use uuid::Uuid;

/// RAII guard for a submission-scoped span.
///
/// ```ignore
/// let _span = VerificationSpan::enter(42);
/// // every event below carries submission_id = 42 and a fresh run_id
/// ```
pub struct VerificationSpan {
    run_id: Uuid,
    _span: tracing::span::EnteredSpan,
}

impl VerificationSpan {
    pub fn enter(submission_id: u64) -> Self {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "conformance.verify",
            submission_id = submission_id,
            run_id = %run_id,
        );
        Self {
            run_id,
            _span: span.entered(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

pub fn emit_verification_started(submission_id: u64, title: &str) {
    info!(event = "verification.started", submission_id, title = %title);
}

/// Emit event: verdict produced.
pub fn emit_verification_finished(
    submission_id: u64,
    state: &str,
    labels: usize,
    failed_scenarios: usize,
    duration_ms: u64,
) {
    info!(
        event = "verification.finished",
        submission_id,
        state = %state,
        labels,
        failed_scenarios,
        duration_ms,
    );
}

/// Emit event: a submission was skipped during a sweep (warning level).
pub fn emit_verification_skipped(submission_id: u64, error: &dyn std::fmt::Display) {
    warn!(event = "verification.skipped", submission_id, error = %error);
}

pub fn emit_scenario_failed(submission_id: u64, scenario: &str, hint: &str) {
    info!(event = "scenario.failed", submission_id, scenario = %scenario, hint = %hint);
}

pub fn emit_requirements_resolved(
    submission_id: u64,
    version: &str,
    required: usize,
    missing: usize,
) {
    info!(
        event = "requirements.resolved",
        submission_id,
        version = %version,
        required,
        missing,
    );
}
