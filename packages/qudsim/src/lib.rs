//! Question-Under-Discussion Document Alignment
//!
//! Measures whether two documents discuss the same underlying content even
//! when they use different words, a different order or a different level of
//! abstraction.
//!
//! # How it works
//!
//! - Each document is numbered sentence by sentence and split into
//!   atomic-topic segments
//! - Each segment is reduced to the questions it answers (QUDs)
//! - Each document's QUDs are posed against the *other* document
//! - The cited evidence becomes a directional segment x segment score,
//!   both directions are combined by harmonic mean and thresholded into an
//!   alignment graph
//!
//! Every model call goes through the [`Capability`] trait and is validated
//! against a typed response shape; rejected responses are retried up to
//! `max_tries` times.
//!
//! # Usage
//!
//! ```rust,ignore
//! use qudsim::{QudSim, QudSimConfig};
//! use qudsim::testing::MockCapability;
//!
//! let generator = MockCapability::new();
//! let answerer = MockCapability::new();
//! let qudsim = QudSim::new(generator, answerer, QudSimConfig::default());
//!
//! let report = qudsim.run(&[story_a, story_b]).await?;
//! println!("{}", report.to_json_pretty()?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Capability and sentence-tokenizer seams
//! - [`types`] - Documents, answers, matrices, config and reports
//! - [`pipeline`] - Numbering, segmentation, QUDs, answering, scoring, orchestration
//! - [`capabilities`] - Capability wrappers (rate limiting)
//! - [`tokenizers`] - Default sentence tokenizer
//! - [`testing`] - Mock implementations for testing

pub mod capabilities;
pub mod error;
pub mod pipeline;
pub mod testing;
pub mod tokenizers;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{QudSimError, Result, ValidationError};
pub use traits::{
    capability::{Capability, CompletionRequest, Task},
    tokenizer::{SentenceTokenizer, TokenizeError},
};
pub use types::{
    answer::{AnswerExcerpt, AnswerSet},
    config::{AbstractionLevel, QudSimConfig},
    document::{
        Document, DocumentStage, NumberedDocument, PreparedDocument, Qud, QudIndex, Segment,
        Segmentation, SentenceMap,
    },
    matrix::{AlignmentMatrix, ScoreMatrix},
    report::{AlignedSegments, AlignmentReport, DroppedDocument, DroppedPair, PairAlignment},
};

// Re-export QudSim from pipeline
pub use pipeline::QudSim;

// Re-export pipeline components
pub use pipeline::{
    // Stages
    abstract_segments, answer_quds, generate_document, generate_quds, number_text,
    segment_document,
    // Scoring
    directional_similarity, document_similarity, harmonic_similarity, qud_overlap,
    segment_scores, threshold_alignment,
    // Retry
    RetryPolicy,
};

// Re-export wrappers and tokenizers
pub use capabilities::{CapabilityExt, RateLimitedCapability, RateLimitedCapabilityBuilder};
pub use tokenizers::UnicodeSentenceTokenizer;

#[cfg(feature = "openai")]
pub use ai::OpenAI;

// Re-export testing utilities
pub use testing::{MockCapability, MockResponse};
