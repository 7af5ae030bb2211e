//! Domain models for submission verification.
//!
//! - `Submission`: the files and metadata under verification
//! - `ReleaseVersion`: loose semantic version arithmetic
//! - `Verdict`: labels + comment + state produced per run

pub mod error;
pub mod submission;
pub mod verdict;
pub mod version;

pub use error::{Result, ScriptError, VerifyError};
pub use submission::{CommitHistory, CommitStatus, Submission, SubmissionFile};
pub use verdict::{Verdict, VerdictState};
pub use version::{is_supported_release, ReleaseVersion, DEFAULT_RELEASE_LOOKBACK};
