//! On-disk submission bundles.
//!
//! A bundle is a directory:
//!
//! ```text
//! <bundle>/submission.json   id, title, author, collections, labels, commits, file_origins
//! <bundle>/files/v1.30/acme/README.md
//! <bundle>/files/v1.30/acme/PRODUCT.yaml
//! ...
//! ```
//!
//! Paths under `files/` become submission file paths verbatim.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::domain::{CommitHistory, Submission, SubmissionFile};

pub const BUNDLE_META_FILE: &str = "submission.json";
pub const BUNDLE_FILES_DIR: &str = "files";

#[derive(Debug, Deserialize)]
struct BundleMeta {
    id: u64,
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    collections: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    commits: CommitHistory,
    /// Submission path -> URL the content was fetched from.
    #[serde(default)]
    file_origins: BTreeMap<String, String>,
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Load one bundle directory into a [`Submission`]. Files are sorted by path.
pub fn load_submission(dir: &Path) -> Result<Submission> {
    let meta_path = dir.join(BUNDLE_META_FILE);
    let raw = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("reading {}", meta_path.display()))?;
    let meta: BundleMeta =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", meta_path.display()))?;

    let mut submission = Submission::new(meta.id, meta.title);
    submission.author = meta.author;
    submission.collections = meta.collections;
    submission.labels = meta.labels;
    submission.commits = meta.commits;

    let files_root = dir.join(BUNDLE_FILES_DIR);
    if files_root.is_dir() {
        for entry in WalkDir::new(&files_root).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", files_root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = relative_path(&files_root, entry.path()) else {
                continue;
            };
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            let mut file = SubmissionFile::new(path, String::from_utf8_lossy(&bytes).into_owned());
            if let Some(origin) = meta.file_origins.get(&file.path) {
                file = file.with_origin(origin.clone());
            }
            submission.files.push(file);
        }
    }
    submission.files.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        submission_id = submission.id,
        files = submission.files.len(),
        "bundle loaded"
    );
    Ok(submission)
}

/// Bundle directories directly under `root`, sorted.
pub fn discover_bundles(root: &Path) -> Result<Vec<PathBuf>> {
    let mut bundles = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("listing {}", root.display()))?;
        if entry.file_type().is_dir() && entry.path().join(BUNDLE_META_FILE).is_file() {
            bundles.push(entry.into_path());
        }
    }
    Ok(bundles)
}
