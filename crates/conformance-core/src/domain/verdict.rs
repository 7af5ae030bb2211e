//! Final verdict handed to the verdict sink.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Coarse state reported alongside the verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerdictState {
    Success,
    Failure,
    Pending,
}

impl VerdictState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictState::Success => "success",
            VerdictState::Failure => "failure",
            VerdictState::Pending => "pending",
        }
    }
}

impl std::fmt::Display for VerdictState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one verification run. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    /// Comment text to post on the submission thread.
    pub comment: String,
    /// Labels in discovery order, without duplicates.
    pub labels: Vec<String>,
    pub state: VerdictState,
}

impl Verdict {
    /// SHA-256 over the canonical JSON form. Equal verdicts have equal digests.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(comment: &str) -> Verdict {
        Verdict {
            comment: comment.to_string(),
            labels: vec!["conformance-product-submission".to_string()],
            state: VerdictState::Success,
        }
    }

    #[test]
    fn test_digest_stable_and_content_sensitive() {
        assert_eq!(verdict("a").digest(), verdict("a").digest());
        assert_ne!(verdict("a").digest(), verdict("b").digest());
        assert_eq!(verdict("a").digest().len(), 64);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&VerdictState::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
