//! Requirement resolution: which tests a release requires.
//!
//! A requirement manifest is published per release at
//! `{root}/{version}/conformance.yaml`. Each record lists the release tags in
//! which a test became required; a test is required for a target release when
//! any of its tags is at or below the target.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ReleaseVersion, Result, VerifyError};

/// File name of the per-release manifest.
pub const MANIFEST_FILE: &str = "conformance.yaml";

/// One manifest record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementRecord {
    /// Human-readable test name.
    pub testname: String,
    /// Canonical test identifier, matched against evidence names.
    pub codename: String,
    /// Comma-separated minimum-release tags, e.g. `"v1.9, v1.18"`.
    pub release: String,
    /// Source file declaring the test.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub description: String,
}

impl RequirementRecord {
    /// Whether any release tag is at or below `target`. Stops at the first
    /// tag that qualifies; unparsable tags are ignored.
    pub fn required_for(&self, target: &ReleaseVersion) -> bool {
        self.release
            .split(',')
            .map(str::trim)
            .filter_map(|tag| ReleaseVersion::parse(tag).ok())
            .any(|tag| tag <= *target)
    }
}

/// Required test identifiers mapped to whether evidence satisfied them.
///
/// Built fresh per resolution; iteration order is lexicographic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSet {
    entries: BTreeMap<String, bool>,
}

impl RequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement, initially unsatisfied.
    pub fn require(&mut self, codename: impl Into<String>) {
        self.entries.entry(codename.into()).or_insert(false);
    }

    pub fn contains(&self, codename: &str) -> bool {
        self.entries.contains_key(codename)
    }

    /// Mark a requirement satisfied. Returns false if it is not required.
    pub fn mark_satisfied(&mut self, codename: &str) -> bool {
        match self.entries.get_mut(codename) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    pub fn is_satisfied(&self, codename: &str) -> bool {
        self.entries.get(codename).copied().unwrap_or(false)
    }

    /// Requirements not yet satisfied, sorted.
    pub fn unsatisfied(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, satisfied)| !**satisfied)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl RequirementSet {
    /// Requirements for `target_version` from already-loaded manifest records.
    pub fn from_records(records: &[RequirementRecord], target_version: &str) -> Result<Self> {
        let target = ReleaseVersion::parse(target_version)?;
        let set: RequirementSet = records
            .iter()
            .filter(|r| r.required_for(&target))
            .map(|r| r.codename.clone())
            .collect();

        debug!(version = %target_version, required = set.len(), "requirement set resolved");
        Ok(set)
    }
}

impl<S: Into<String>> FromIterator<S> for RequirementSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for codename in iter {
            set.require(codename);
        }
        set
    }
}

/// File-backed requirement metadata store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementResolver {
    root: PathBuf,
}

impl RequirementResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Manifest location for a release, keyed by the version string as given.
    pub fn manifest_path(&self, version: &str) -> PathBuf {
        self.root.join(version).join(MANIFEST_FILE)
    }

    /// Whether a manifest has been published for `version`.
    pub fn has_manifest(&self, version: &str) -> bool {
        self.manifest_path(version).is_file()
    }

    /// Load the raw manifest records for `version`.
    pub fn load_manifest(&self, version: &str) -> Result<Vec<RequirementRecord>> {
        let path = self.manifest_path(version);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => VerifyError::MetadataUnavailable {
                version: version.to_string(),
            },
            _ => VerifyError::MetadataCorrupt {
                version: version.to_string(),
                reason: e.to_string(),
            },
        })?;

        serde_yaml::from_str(&content).map_err(|e| VerifyError::MetadataCorrupt {
            version: version.to_string(),
            reason: e.to_string(),
        })
    }

    /// Resolve the set of tests required for `target_version`.
    pub fn resolve(&self, target_version: &str) -> Result<RequirementSet> {
        let records = self.load_manifest(target_version)?;
        RequirementSet::from_records(&records, target_version)
    }
}
