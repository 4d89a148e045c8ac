//! Alignment pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Sentence numbering
//! - Segmentation into atomic topics (validated, retried)
//! - Optional decontextualization of segments
//! - QUD generation per segment
//! - Cross-answering in both directions of every pair
//! - Frequency-based scoring, harmonic combination and thresholding

pub mod abstraction;
pub mod align;
pub mod answer;
pub mod number;
pub mod prompts;
pub mod qud;
pub mod retry;
pub mod schema;
pub mod segment;
pub mod similarity;

pub use abstraction::{abstract_segments, validate_abstraction};
pub use align::QudSim;
pub use answer::{answer_quds, validate_answers};
pub use number::{normalize_quotes, number_text};
pub use prompts::{
    format_abstract_prompt, format_answer_prompt, format_segment_prompt, ABSTRACT_PROMPT,
    ANSWER_PROMPT, QUD_PROMPT, SEGMENT_PROMPT,
};
pub use qud::{generate_document, generate_quds, validate_quds};
pub use retry::{request_for, request_validated, RetryPolicy};
pub use schema::{
    AbstractionResponse, AnswerResponse, ExcerptItem, ParagraphItem, QudResponse, QudItem,
    ResponseShape, SegmentItem, SegmentationResponse, SentenceRef,
};
pub use segment::{segment_document, validate_segmentation};
pub use similarity::{
    directional_similarity, document_similarity, harmonic_similarity, qud_overlap,
    segment_scores, threshold_alignment,
};
