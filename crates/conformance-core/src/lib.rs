//! Conformance submission verification.
//!
//! Resolves which tests a release requires, reconciles them against the
//! submitted evidence, runs the rule script over the submission and reduces
//! the run into a [`Verdict`] (labels, comment, state).

pub mod aggregate;
pub mod bundle;
pub mod config;
pub mod domain;
pub mod evidence;
pub mod labels;
pub mod metrics;
pub mod obs;
pub mod product;
pub mod requirements;
pub mod rules;
pub mod sink;
pub mod telemetry;
pub mod verifier;

pub use aggregate::{aggregate, DOCS_TRAILER, PENDING_COMMENT};
pub use bundle::{discover_bundles, load_submission};
pub use config::{ConfigError, VerifierConfig};
pub use domain::{
    is_supported_release, CommitHistory, CommitStatus, ReleaseVersion, Result, ScriptError,
    Submission, SubmissionFile, Verdict, VerdictState, VerifyError, DEFAULT_RELEASE_LOOKBACK,
};
pub use evidence::{extract, reconcile, E2eSummary, OutcomeStatus, TestOutcome};
pub use metrics::METRICS;
pub use product::ProductDescriptor;
pub use requirements::{RequirementRecord, RequirementResolver, RequirementSet};
pub use rules::{
    compile_script, CompiledScript, RuleContext, RuleScript, RunRecord, ScenarioResult, Step,
    StepRegistry, StepResult, StepStatus, DEFAULT_RULES,
};
pub use sink::{FsVerdictSink, LabelDiff, MemoryVerdictSink, PublishOutcome, VerdictSink};
pub use telemetry::init_tracing;
pub use verifier::{
    verify_all, verify_batch, SkippedSubmission, SweepReport, Verification, Verifier,
};
