//! In-memory model of one conformance submission.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern every submission file path must follow: `{version}/{product}/...`.
const FOLDER_PATTERN: &str = r"^(v\d+\.\d+)/([^/]+)/.+$";

pub(crate) fn folder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FOLDER_PATTERN).expect("folder pattern is a valid regex"))
}

fn title_version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(v\d+\.\d+)\b").expect("title pattern is a valid regex"))
}

/// A single file in the submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionFile {
    /// Full path relative to the repository root, `/`-separated.
    pub path: String,
    /// Base name (last path segment).
    pub name: String,
    /// Raw textual content.
    pub content: String,
    /// Where the content was fetched from, if known.
    pub origin_url: Option<String>,
}

impl SubmissionFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            path,
            name,
            content: content.into(),
            origin_url: None,
        }
    }

    pub fn with_origin(mut self, url: impl Into<String>) -> Self {
        self.origin_url = Some(url.into());
        self
    }

    /// The `(version, product)` folder pair this file lives under, if any.
    pub fn folder(&self) -> Option<(String, String)> {
        folder_regex()
            .captures(&self.path)
            .map(|caps| (caps[1].to_string(), caps[2].to_string()))
    }
}

/// Status context reported against a commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStatus {
    pub sha: String,
    pub context: String,
    pub state: String,
}

/// Summary of the submission's commit history.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitHistory {
    pub count: u32,
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
}

/// One submission under verification.
///
/// `target_version` and `product_name` stay empty until
/// [`Submission::derive_metadata`] runs; rules treat empty as "not yet
/// determined", never as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub collections: Vec<String>,
    pub files: Vec<SubmissionFile>,
    pub labels: Vec<String>,
    pub commits: CommitHistory,
    pub target_version: String,
    pub product_name: String,
}

impl Submission {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: SubmissionFile) -> Self {
        self.files.push(file);
        self
    }

    /// Look up a file by base name, ignoring case.
    pub fn file_by_name(&self, name: &str) -> Option<&SubmissionFile> {
        self.files
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Distinct `{version}/{product}` folders across all files, sorted.
    pub fn folders(&self) -> BTreeSet<(String, String)> {
        self.files.iter().filter_map(SubmissionFile::folder).collect()
    }

    /// Files whose path does not follow the `{version}/{product}/...` layout.
    pub fn misplaced_files(&self) -> Vec<&SubmissionFile> {
        self.files.iter().filter(|f| f.folder().is_none()).collect()
    }

    /// Set `target_version` and `product_name` from the folder structure.
    ///
    /// Both are only set when the files agree on exactly one folder pair.
    pub fn derive_metadata(&mut self) {
        let folders = self.folders();
        if folders.len() != 1 {
            return;
        }
        if let Some((version, product)) = folders.into_iter().next() {
            self.target_version = version;
            self.product_name = product;
        }
    }

    /// The first `vX.Y` release tag mentioned in the title.
    pub fn title_version(&self) -> Option<&str> {
        title_version_regex()
            .captures(&self.title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}
