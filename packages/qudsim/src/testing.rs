//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the alignment library
//! without making real model calls.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{QudSimError, Result, ValidationError};
use crate::traits::{
    capability::{Capability, CompletionRequest, Task},
    tokenizer::{SentenceTokenizer, TokenizeError},
};
use crate::types::document::{
    Document, GeneratedArtifacts, NumberedDocument, PreparedDocument, Segment, Segmentation,
    SentenceMap,
};

type Handler = Arc<dyn Fn(&CompletionRequest) -> Result<Value> + Send + Sync>;

/// One scripted reply of [`MockCapability`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this value
    Value(Value),
    /// Return "no result"
    Null,
    /// Fail the call with a capability error
    Fail(String),
}

/// Record of a call made to the mock capability.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub task: Task,
    pub model: String,
    pub prompt: String,
}

/// A scripted capability for testing.
///
/// For each request the mock answers, in order of precedence:
/// 1. the next scripted response queued for the task
/// 2. the handler registered for the task
/// 3. the default value registered for the task
///
/// Otherwise the call fails with a capability error.
#[derive(Default, Clone)]
pub struct MockCapability {
    /// Queued responses by task
    scripts: Arc<RwLock<HashMap<Task, VecDeque<MockResponse>>>>,

    /// Request-dependent responses by task
    handlers: Arc<RwLock<HashMap<Task, Handler>>>,

    /// Fallback responses by task
    defaults: Arc<RwLock<HashMap<Task, Value>>>,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockCapability {
    /// Create a new mock with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue responses for a task, consumed one per call.
    pub fn with_responses(self, task: Task, responses: Vec<MockResponse>) -> Self {
        self.scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(task)
            .or_default()
            .extend(responses);
        self
    }

    /// Answer a task with a function of the request.
    pub fn with_handler<F>(self, task: Task, handler: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task, Arc::new(handler));
        self
    }

    /// Answer a task with a fixed value once its script runs out.
    pub fn with_default(self, task: Task, value: Value) -> Self {
        self.defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task, value);
        self
    }

    /// Delay every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made for one task.
    pub fn calls_for(&self, task: Task) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.task == task)
            .collect()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn respond(&self, request: &CompletionRequest) -> Result<Value> {
        let scripted = self
            .scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&request.task)
            .and_then(VecDeque::pop_front);

        if let Some(response) = scripted {
            return match response {
                MockResponse::Value(value) => Ok(value),
                MockResponse::Null => Ok(Value::Null),
                MockResponse::Fail(reason) => Err(QudSimError::Capability(reason.into())),
            };
        }

        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.task)
            .cloned();
        if let Some(handler) = handler {
            return (*handler)(request);
        }

        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.task)
            .cloned()
            .ok_or_else(|| {
                QudSimError::Capability(format!("no mock response for {}", request.task).into())
            })
    }
}

#[async_trait]
impl Capability for MockCapability {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                task: request.task,
                model: request.model.clone(),
                prompt: request.prompt.clone(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.respond(request)
    }
}

/// A tokenizer that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTokenizer;

impl SentenceTokenizer for FailingTokenizer {
    fn tokenize(&self, _text: &str) -> std::result::Result<Vec<String>, TokenizeError> {
        Err(TokenizeError("tokenizer unavailable".to_string()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A numbered document built directly from its sentences.
pub fn numbered_document(id: usize, sentences: &[&str]) -> NumberedDocument {
    let sentence_map = SentenceMap::new(sentences.iter().map(|s| s.to_string()).collect());
    NumberedDocument {
        id,
        content_hash: Document::hash_content(&sentences.join(" ")),
        numbered_text: sentence_map.numbered_text(),
        sentence_map,
    }
}

/// A prepared document with the given segmentation and QUDs.
pub fn prepared_document(
    id: usize,
    sentences: &[&str],
    segments: &[&[usize]],
    quds: &[&[&str]],
) -> std::result::Result<PreparedDocument, ValidationError> {
    PreparedDocument::assemble(
        numbered_document(id, sentences),
        GeneratedArtifacts {
            segmentation: Segmentation::new(
                segments.iter().map(|s| Segment::new(s.to_vec())).collect(),
            ),
            abstracted_segments: None,
            quds_per_segment: quds
                .iter()
                .map(|qs| qs.iter().map(|q| q.to_string()).collect())
                .collect(),
        },
    )
}

/// `{"segmentation": [{"sentences": [...]}, ...]}`
pub fn segmentation_json(segments: &[&[i64]]) -> Value {
    json!({
        "segmentation": segments
            .iter()
            .map(|sentences| json!({"sentences": sentences}))
            .collect::<Vec<_>>()
    })
}

/// `{"decontextualized_paragraphs": [{"para_num": i, "para": ...}, ...]}`
pub fn abstraction_json(paragraphs: &[&str]) -> Value {
    json!({
        "decontextualized_paragraphs": paragraphs
            .iter()
            .enumerate()
            .map(|(i, para)| json!({"para_num": i, "para": para}))
            .collect::<Vec<_>>()
    })
}

/// `{"num_quds": n, "quds": [{"qud": ...}, ...]}`
pub fn qud_json(quds: &[&str]) -> Value {
    json!({
        "num_quds": quds.len(),
        "quds": quds.iter().map(|qud| json!({"qud": qud})).collect::<Vec<_>>()
    })
}

/// `{"excerpts": [{"question": ..., "sentence_nums": [...], "sentences": []}, ...]}`
pub fn answer_json(excerpts: &[(&str, &[i64])]) -> Value {
    json!({
        "excerpts": excerpts
            .iter()
            .map(|(question, nums)| json!({
                "question": question,
                "sentence_nums": nums,
                "sentences": []
            }))
            .collect::<Vec<_>>()
    })
}
