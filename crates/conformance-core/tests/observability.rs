//! Observability tests for verification lifecycle tracing.
//!
//! Each test captures the events emitted while verifying a submission and
//! checks the stable `event` names log pipelines key on.

use std::fs;

use conformance_core::obs::{
    emit_requirements_resolved, emit_verification_skipped, VerificationSpan,
};
use conformance_core::{
    verify_all, verify_batch, RequirementResolver, Submission, SubmissionFile, Verifier,
};
use tracing_test::traced_test;

fn verifier(meta: &std::path::Path) -> Verifier {
    Verifier::with_default_rules(RequirementResolver::new(meta), "v1.31", 2).unwrap()
}

fn sparse_submission(id: u64, version: &str) -> Submission {
    Submission::new(id, format!("Conformance results for {version}/Acme"))
        .with_file(SubmissionFile::new(format!("{version}/acme/README.md"), "# Acme"))
}

#[traced_test]
#[test]
fn test_verify_emits_started_and_finished() {
    let meta = tempfile::tempdir().unwrap();
    let v = verifier(meta.path());

    v.verify(sparse_submission(41, "v1.30")).unwrap();

    assert!(logs_contain("verification.started"));
    assert!(logs_contain("verification.finished"));
    assert!(logs_contain("state=failure"));
    assert!(logs_contain("conformance.verify"));
}

#[traced_test]
#[test]
fn test_failed_scenarios_are_logged() {
    let meta = tempfile::tempdir().unwrap();
    let v = verifier(meta.path());

    v.verify(sparse_submission(42, "v1.30")).unwrap();

    assert!(logs_contain("scenario.failed"));
    assert!(logs_contain("missing required file 'PRODUCT.yaml'"));
}

#[traced_test]
#[test]
fn test_sweep_logs_skipped_submission() {
    let meta = tempfile::tempdir().unwrap();
    let dir = meta.path().join("v1.30");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("conformance.yaml"), "- testname: [unclosed\n").unwrap();
    let v = verifier(meta.path());

    let report = verify_all(&v, vec![sparse_submission(43, "v1.30")]);

    assert_eq!(report.skipped.len(), 1);
    assert!(logs_contain("verification.skipped"));
    assert!(logs_contain("WARN"));
}

#[traced_test]
#[test]
fn test_emit_requirements_resolved_logs_counts() {
    emit_requirements_resolved(44, "v1.30", 12, 3);

    assert!(logs_contain("requirements.resolved"));
    assert!(logs_contain("required=12"));
    assert!(logs_contain("missing=3"));
}

#[traced_test]
#[test]
fn test_emit_verification_skipped_is_a_warning() {
    emit_verification_skipped(45, &"metadata unreadable");

    assert!(logs_contain("WARN"));
    assert!(logs_contain("metadata unreadable"));
}

#[traced_test]
#[test]
fn test_span_fields_attach_to_events() {
    let span = VerificationSpan::enter(46);
    let run_id = span.run_id().to_string();
    emit_requirements_resolved(46, "v1.30", 1, 0);
    drop(span);

    assert!(logs_contain("submission_id=46"));
    assert!(logs_contain(&run_id));
}

#[traced_test]
#[test]
fn test_only_full_sweep_flushes_metrics() {
    let meta = tempfile::tempdir().unwrap();
    let v = verifier(meta.path());

    let report = verify_batch(&v, vec![sparse_submission(47, "v1.30")]);
    assert_eq!(report.verified.len(), 1);
    assert!(!logs_contain("verdicts_pending="));

    verify_all(&v, vec![sparse_submission(48, "v1.30")]);
    assert!(logs_contain("verdicts_pending="));
}
