//! Typed errors for the alignment pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

use crate::traits::capability::Task;

/// Errors that can occur while preparing or aligning documents.
#[derive(Debug, Error)]
pub enum QudSimError {
    /// Run configuration violates an invariant
    #[error("invalid configuration for `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    /// Sentence numbering failed for a document
    #[error("document {document} could not be preprocessed: {reason}")]
    Preprocessing { document: usize, reason: String },

    /// A validated step used up all of its attempts
    #[error("{task} failed after {attempts} attempt(s): {last_error}")]
    GenerationExhausted {
        task: Task,
        attempts: u32,
        last_error: String,
    },

    /// Not enough documents or pairs survived to continue
    #[error("{stage} needs at least {required} item(s), only {available} available")]
    InsufficientInput {
        stage: &'static str,
        required: usize,
        available: usize,
    },

    /// Structured-completion backend failed
    #[error("capability error: {0}")]
    Capability(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A single capability call exceeded its deadline
    #[error("{task} call timed out after {millis}ms")]
    Timeout { task: Task, millis: u64 },

    /// Matrices or answer sets disagree on their dimensions
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Generated artifacts failed their final consistency check
    #[error("generated artifacts are inconsistent: {0}")]
    Validation(#[from] ValidationError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QudSimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            field,
            reason: reason.into(),
        }
    }
}

/// Reasons a capability response is rejected and the request retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Capability returned nothing
    #[error("empty response")]
    EmptyResponse,

    /// Response did not match the expected shape
    #[error("response does not match schema: {0}")]
    Schema(String),

    /// Segmentation left sentences out
    #[error("sentences missing from segmentation: {0:?}")]
    MissingSentences(Vec<usize>),

    /// Segmentation cited sentences the document does not have
    #[error("unknown sentence numbers: {0:?}")]
    UnknownSentences(Vec<i64>),

    /// Segmentation assigned sentences to more than one segment
    #[error("sentences assigned to more than one segment: {0:?}")]
    OverlappingSentences(Vec<usize>),

    /// A segment without any sentence
    #[error("segment {0} is empty")]
    EmptySegment(usize),

    /// Wrong number of items returned
    #[error("expected {expected} item(s), got {found}")]
    CountMismatch { expected: usize, found: usize },

    /// QUD generation produced no usable question
    #[error("no QUDs generated")]
    NoQuds,
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, QudSimError>;
