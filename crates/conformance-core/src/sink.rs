//! Verdict sinks: where finished verdicts are published.
//!
//! The core never talks to a hosting platform. A sink receives the
//! submission and its verdict; [`LabelDiff`] tells it which labels to add
//! and remove so that only verifier-managed labels are touched.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Submission, Verdict};
use crate::labels;

/// Whether a publish changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Published,
    /// An identical verdict was already published.
    Unchanged,
}

#[async_trait]
pub trait VerdictSink: Send + Sync {
    async fn publish(&self, submission: &Submission, verdict: &Verdict) -> Result<PublishOutcome>;
}

/// Label changes needed to move a submission to its verdict's label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDiff {
    /// Verdict labels not yet present, in verdict order.
    pub add: Vec<String>,
    /// Managed labels present but no longer wanted, in current order.
    pub remove: Vec<String>,
}

impl LabelDiff {
    pub fn between(current: &[String], desired: &[String]) -> Self {
        let add = desired
            .iter()
            .filter(|l| !current.contains(l))
            .cloned()
            .collect();
        let remove = current
            .iter()
            .filter(|l| labels::is_managed(l) && !desired.contains(l))
            .cloned()
            .collect();
        Self { add, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Record written next to each published verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishedVerdict {
    pub submission_id: u64,
    pub digest: String,
    pub verdict: Verdict,
    pub labels: LabelDiff,
}

// ---------------------------------------------------------------------------
// FsVerdictSink
// ---------------------------------------------------------------------------

/// Writes `<root>/<id>/verdict.json` and `<root>/<id>/comment.md`.
#[derive(Debug, Clone)]
pub struct FsVerdictSink {
    root: PathBuf,
}

impl FsVerdictSink {
    pub const VERDICT_FILE: &'static str = "verdict.json";
    pub const COMMENT_FILE: &'static str = "comment.md";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn submission_dir(&self, id: u64) -> PathBuf {
        self.root.join(id.to_string())
    }

    async fn stored_digest(&self, path: &Path) -> Option<String> {
        let raw = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice::<PublishedVerdict>(&raw)
            .ok()
            .map(|p| p.digest)
    }
}

#[async_trait]
impl VerdictSink for FsVerdictSink {
    async fn publish(&self, submission: &Submission, verdict: &Verdict) -> Result<PublishOutcome> {
        let dir = self.submission_dir(submission.id);
        let verdict_path = dir.join(Self::VERDICT_FILE);
        let digest = verdict.digest();

        if self.stored_digest(&verdict_path).await.as_deref() == Some(digest.as_str()) {
            tracing::debug!(submission_id = submission.id, "verdict unchanged");
            return Ok(PublishOutcome::Unchanged);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let record = PublishedVerdict {
            submission_id: submission.id,
            digest,
            verdict: verdict.clone(),
            labels: LabelDiff::between(&submission.labels, &verdict.labels),
        };
        let json = serde_json::to_vec_pretty(&record).context("serializing verdict")?;
        tokio::fs::write(&verdict_path, json)
            .await
            .with_context(|| format!("writing {}", verdict_path.display()))?;

        let comment_path = dir.join(Self::COMMENT_FILE);
        tokio::fs::write(&comment_path, verdict.comment.as_bytes())
            .await
            .with_context(|| format!("writing {}", comment_path.display()))?;

        tracing::info!(
            submission_id = submission.id,
            path = %verdict_path.display(),
            state = %verdict.state,
            "verdict published"
        );
        Ok(PublishOutcome::Published)
    }
}

// ---------------------------------------------------------------------------
// MemoryVerdictSink
// ---------------------------------------------------------------------------

/// Keeps published verdicts in memory, deduplicating by digest.
#[derive(Debug, Default)]
pub struct MemoryVerdictSink {
    published: Mutex<Vec<PublishedVerdict>>,
}

impl MemoryVerdictSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publication that changed something, oldest first.
    pub fn published(&self) -> Vec<PublishedVerdict> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent verdict published for `id`.
    pub fn latest(&self, id: u64) -> Option<Verdict> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|p| p.submission_id == id)
            .map(|p| p.verdict.clone())
    }
}

#[async_trait]
impl VerdictSink for MemoryVerdictSink {
    async fn publish(&self, submission: &Submission, verdict: &Verdict) -> Result<PublishOutcome> {
        let digest = verdict.digest();
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        let unchanged = published
            .iter()
            .rev()
            .find(|p| p.submission_id == submission.id)
            .is_some_and(|p| p.digest == digest);
        if unchanged {
            return Ok(PublishOutcome::Unchanged);
        }
        published.push(PublishedVerdict {
            submission_id: submission.id,
            digest,
            verdict: verdict.clone(),
            labels: LabelDiff::between(&submission.labels, &verdict.labels),
        });
        Ok(PublishOutcome::Published)
    }
}
