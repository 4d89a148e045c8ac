//! Run configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{QudSimError, Result};

/// Abstraction level of generated QUDs.
///
/// Serialized as the integer level (`0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AbstractionLevel {
    /// Level 0: QUDs are generated from the segment text itself.
    #[default]
    Specific,

    /// Level 1: segments are decontextualized first, QUDs are generated
    /// from the abstracted paragraphs.
    Abstract,
}

impl TryFrom<u8> for AbstractionLevel {
    type Error = QudSimError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Self::Specific),
            1 => Ok(Self::Abstract),
            other => Err(QudSimError::config(
                "level",
                format!("levels 0 (specific) and 1 (abstract) are supported, got {}", other),
            )),
        }
    }
}

impl From<AbstractionLevel> for u8 {
    fn from(level: AbstractionLevel) -> Self {
        match level {
            AbstractionLevel::Specific => 0,
            AbstractionLevel::Abstract => 1,
        }
    }
}

/// Configuration for an alignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QudSimConfig {
    /// QUD abstraction level.
    ///
    /// Default: `Specific`.
    pub level: AbstractionLevel,

    /// Harmonic score at or above which two segments are aligned.
    ///
    /// Must lie in `[0, 1]`. Default: 0.5.
    pub threshold: f64,

    /// Attempts per validated step before giving up.
    ///
    /// Default: 3.
    pub max_tries: u32,

    /// Model used for segmentation, abstraction and QUD generation.
    pub generation_model: String,

    /// Model used for cross-answering.
    pub answer_model: String,

    /// Documents (and pairs) processed at once.
    ///
    /// Output order never depends on this. Default: 1 (sequential).
    pub concurrency: usize,

    /// Deadline for a single capability call, in milliseconds.
    ///
    /// A timed-out call counts as a failed attempt. Default: none.
    pub call_timeout_ms: Option<u64>,

    /// Accept segmentations that put a sentence in several segments.
    ///
    /// Set to false to require a strict partition. Default: true.
    pub allow_segment_overlap: bool,
}

impl Default for QudSimConfig {
    fn default() -> Self {
        Self {
            level: AbstractionLevel::Specific,
            threshold: 0.5,
            max_tries: 3,
            generation_model: "gpt-4o".to_string(),
            answer_model: "gpt-4o".to_string(),
            concurrency: 1,
            call_timeout_ms: None,
            allow_segment_overlap: true,
        }
    }
}

impl QudSimConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the abstraction level.
    pub fn with_level(mut self, level: AbstractionLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the alignment threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the retry ceiling.
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Set the generation and answer models.
    pub fn with_models(mut self, generation: impl Into<String>, answer: impl Into<String>) -> Self {
        self.generation_model = generation.into();
        self.answer_model = answer.into();
        self
    }

    /// Set the fan-out width.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Tolerate overlapping segments, or require a strict partition.
    pub fn with_segment_overlap(mut self, allow: bool) -> Self {
        self.allow_segment_overlap = allow;
        self
    }

    /// Per-call deadline as a `Duration`.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Check every invariant. Called before any work starts.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(QudSimError::config(
                "threshold",
                format!("must lie within [0, 1], got {}", self.threshold),
            ));
        }

        if self.max_tries == 0 {
            return Err(QudSimError::config("max_tries", "must be at least 1"));
        }

        if self.concurrency == 0 {
            return Err(QudSimError::config("concurrency", "must be at least 1"));
        }

        if self.call_timeout_ms == Some(0) {
            return Err(QudSimError::config(
                "call_timeout_ms",
                "must be at least 1 millisecond when set",
            ));
        }

        Ok(())
    }
}
