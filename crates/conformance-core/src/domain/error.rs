//! Error taxonomy for submission verification.
//!
//! The `Display` text of a [`VerifyError`] is user-facing: when a rule step
//! fails, the message lands verbatim in the verdict comment as a review hint.

/// Errors produced while parsing or binding a rule script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("rule script is empty")]
    EmptyScript,

    #[error("line {line}: unexpected content: {content}")]
    UnexpectedLine { line: usize, content: String },

    #[error("line {line}: step declared outside of a scenario or background")]
    StepOutsideScenario { line: usize },

    #[error("line {line}: scenario outline '{name}' has no examples")]
    MissingExamples { line: usize, name: String },

    #[error("line {line}: example row has {actual} cells, header has {expected}")]
    ExampleArity {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: placeholder <{placeholder}> is not an examples column")]
    UnknownPlaceholder { line: usize, placeholder: String },

    #[error("line {line}: no step definition matches: {text}")]
    UndefinedStep { line: usize, text: String },
}

/// Verification errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("'{0}' is not a valid release version")]
    MalformedVersion(String),

    #[error("no requirement metadata is published for release {version}")]
    MetadataUnavailable { version: String },

    #[error("requirement metadata for release {version} is unreadable: {reason}")]
    MetadataCorrupt { version: String, reason: String },

    #[error("release {target} is no longer supported; the oldest supported release is {oldest}")]
    UnsupportedRelease { target: String, oldest: String },

    #[error("test evidence file '{0}' is missing from the submission")]
    EvidenceMissing(String),

    #[error("test evidence file '{file}' could not be read: {reason}")]
    EvidenceCorrupt { file: String, reason: String },

    #[error("missing required file '{0}'")]
    FileMissing(String),

    #[error("{file}: {reason}")]
    FieldInvalid { file: String, reason: String },

    #[error("{0}")]
    FolderStructureInvalid(String),

    #[error("{0}")]
    TitleMismatch(String),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Result type for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
