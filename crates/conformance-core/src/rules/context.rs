//! Per-run state shared by the steps of one verification.

use crate::domain::Submission;
use crate::labels;
use crate::requirements::{RequirementRecord, RequirementResolver};

/// Mutable context for a single submission's rule run.
///
/// Created fresh for every verification; nothing carries over between
/// submissions.
#[derive(Debug)]
pub struct RuleContext<'a> {
    submission: &'a Submission,
    resolver: &'a RequirementResolver,
    labels: Vec<String>,
    missing_files: Vec<String>,
    latest_version: String,
    lookback: u64,
    requirements_pending: bool,
    manifest: Option<Vec<RequirementRecord>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        submission: &'a Submission,
        resolver: &'a RequirementResolver,
        latest_version: impl Into<String>,
        lookback: u64,
    ) -> Self {
        Self {
            submission,
            resolver,
            labels: Vec::new(),
            missing_files: Vec::new(),
            latest_version: latest_version.into(),
            lookback,
            requirements_pending: false,
            manifest: None,
        }
    }

    pub fn submission(&self) -> &'a Submission {
        self.submission
    }

    pub fn resolver(&self) -> &'a RequirementResolver {
        self.resolver
    }

    /// Target release from the folder layout; empty when undetermined.
    pub fn target_version(&self) -> &'a str {
        &self.submission.target_version
    }

    pub fn latest_version(&self) -> &str {
        &self.latest_version
    }

    pub fn lookback(&self) -> u64 {
        self.lookback
    }

    /// Labels added by steps, in insertion order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        labels::push_unique(&mut self.labels, label);
    }

    pub fn missing_files(&self) -> &[String] {
        &self.missing_files
    }

    pub fn add_missing_file(&mut self, name: impl Into<String>) {
        labels::push_unique(&mut self.missing_files, name);
    }

    /// Flag that requirement metadata for the target is not yet published.
    pub fn mark_requirements_pending(&mut self) {
        self.requirements_pending = true;
    }

    pub fn requirements_pending(&self) -> bool {
        self.requirements_pending
    }

    /// Keep the target's manifest records loaded before the run.
    pub fn set_manifest(&mut self, records: Vec<RequirementRecord>) {
        self.manifest = Some(records);
    }

    /// Manifest records loaded before the run, if any.
    pub fn manifest(&self) -> Option<&[RequirementRecord]> {
        self.manifest.as_deref()
    }
}
