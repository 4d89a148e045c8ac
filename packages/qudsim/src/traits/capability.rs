//! Capability trait for structured LLM completions.
//!
//! Every model-backed step of the pipeline goes through one operation:
//! send a system instruction, a prompt and the JSON schema of the expected
//! result, get back a JSON value. Parsing into typed shapes happens on the
//! pipeline side so that schema violations become retryable validation
//! failures rather than backend errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// The pipeline step a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Partition a numbered document into atomic-topic segments
    Segmentation,
    /// Decontextualize segment text (abstract level only)
    Abstraction,
    /// Produce questions under discussion for one segment
    QudGeneration,
    /// Answer one document's QUDs against another document
    CrossAnswer,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Segmentation => "segmentation",
            Task::Abstraction => "abstraction",
            Task::QudGeneration => "QUD generation",
            Task::CrossAnswer => "cross-answering",
        };
        f.write_str(name)
    }
}

/// A single structured-completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub task: Task,

    /// Model for the role this request belongs to
    pub model: String,
    pub system: String,
    pub prompt: String,

    /// Name of the expected result shape
    pub schema_name: String,

    /// Strict JSON schema of the expected result
    pub schema: serde_json::Value,
}

/// Structured-completion capability.
///
/// Implementations wrap a specific LLM provider. They should be stateless
/// enough to be shared between concurrent callers.
///
/// Returning `serde_json::Value::Null` signals "no result"; the caller
/// treats it like any other rejected attempt.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value>;
}

#[async_trait]
impl<C: Capability + ?Sized> Capability for Arc<C> {
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value> {
        (**self).complete(request).await
    }
}

#[async_trait]
impl<C: Capability + ?Sized> Capability for &C {
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value> {
        (**self).complete(request).await
    }
}
