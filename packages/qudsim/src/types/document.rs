//! Document types and their lifecycle.
//!
//! A document moves through three typed states:
//!
//! - [`Document`] - raw text as supplied by the caller
//! - [`NumberedDocument`] - sentences numbered from 1
//! - [`PreparedDocument`] - segmented, QUDs generated, indices validated
//!
//! Each state is immutable; the transitions consume the previous state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{QudSimError, Result, ValidationError};
use crate::pipeline::number::number_text;
use crate::traits::tokenizer::SentenceTokenizer;

/// Lifecycle stage of a document within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStage {
    Raw,
    Preprocessed,
    Generated,
    Ready,
    Failed,
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentStage::Raw => "raw",
            DocumentStage::Preprocessed => "preprocessed",
            DocumentStage::Generated => "generated",
            DocumentStage::Ready => "ready",
            DocumentStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Sentences
// =============================================================================

/// Ordered mapping sentence-number -> sentence text.
///
/// Sentence `n` lives at position `n - 1`, so the keys are always
/// `1..=len` with no gaps. Serialized as a JSON object keyed by number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SentenceMap {
    sentences: Vec<String>,
}

impl SentenceMap {
    pub fn new(sentences: Vec<String>) -> Self {
        Self { sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Valid sentence numbers.
    pub fn numbers(&self) -> RangeInclusive<usize> {
        1..=self.sentences.len()
    }

    /// Whether `number` names a sentence of this document.
    pub fn contains(&self, number: usize) -> bool {
        number >= 1 && number <= self.sentences.len()
    }

    /// Sentence text by 1-based number.
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.sentences.get(idx))
            .map(String::as_str)
    }

    /// Map a raw (possibly negative) number to a valid sentence number.
    pub fn resolve(&self, number: i64) -> Option<usize> {
        usize::try_from(number).ok().filter(|n| self.contains(*n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.sentences
            .iter()
            .enumerate()
            .map(|(idx, sentence)| (idx + 1, sentence.as_str()))
    }

    /// `"[1] first sentence[2] second sentence..."`
    pub fn numbered_text(&self) -> String {
        self.iter()
            .map(|(number, sentence)| format!("[{}] {}", number, sentence))
            .collect()
    }

    /// Join the given sentences with single spaces. Unknown numbers are skipped.
    pub fn join(&self, numbers: &[usize]) -> String {
        numbers
            .iter()
            .filter_map(|n| self.get(*n))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Serialize for SentenceMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for SentenceMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = BTreeMap::<usize, String>::deserialize(deserializer)?;
        for (expected, number) in (1..).zip(map.keys()) {
            if *number != expected {
                return Err(serde::de::Error::custom(format!(
                    "sentence numbers must be contiguous from 1, found {} at position {}",
                    number, expected
                )));
            }
        }
        Ok(Self::new(map.into_values().collect()))
    }
}

// =============================================================================
// Segments
// =============================================================================

/// An ordered, non-empty group of sentence numbers within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub sentences: Vec<usize>,
}

impl Segment {
    pub fn new(sentences: Vec<usize>) -> Self {
        Self { sentences }
    }

    pub fn sentence_set(&self) -> BTreeSet<usize> {
        self.sentences.iter().copied().collect()
    }
}

/// A validated segmentation of one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
}

impl Segmentation {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// First segment containing `sentence`.
    pub fn segment_of(&self, sentence: usize) -> Option<usize> {
        self.segments
            .iter()
            .position(|segment| segment.sentences.contains(&sentence))
    }

    /// Text of every segment, sentences joined with single spaces.
    pub fn texts(&self, sentence_map: &SentenceMap) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| sentence_map.join(&segment.sentences))
            .collect()
    }
}

// =============================================================================
// QUDs
// =============================================================================

/// A question under discussion, owned by one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qud {
    pub question: String,
    pub segment: usize,
}

/// Bidirectional segment <-> QUD index.
///
/// QUD indices are zero-based, globally unique within a document and
/// assigned in segment order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QudIndex {
    segment_to_quds: Vec<Vec<usize>>,
    qud_to_segment: Vec<usize>,
}

impl QudIndex {
    /// Build from the number of QUDs of each segment, in segment order.
    ///
    /// Every segment must own at least one QUD.
    pub fn from_counts(counts: &[usize]) -> std::result::Result<Self, ValidationError> {
        let mut segment_to_quds = Vec::with_capacity(counts.len());
        let mut qud_to_segment = Vec::with_capacity(counts.iter().sum());

        for (segment, &count) in counts.iter().enumerate() {
            if count == 0 {
                return Err(ValidationError::NoQuds);
            }
            let start = qud_to_segment.len();
            segment_to_quds.push((start..start + count).collect());
            qud_to_segment.extend(std::iter::repeat(segment).take(count));
        }

        Ok(Self {
            segment_to_quds,
            qud_to_segment,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.segment_to_quds.len()
    }

    pub fn num_quds(&self) -> usize {
        self.qud_to_segment.len()
    }

    /// QUD indices owned by `segment`.
    pub fn quds_of(&self, segment: usize) -> &[usize] {
        self.segment_to_quds
            .get(segment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Segment owning QUD `qud`.
    pub fn segment_of(&self, qud: usize) -> Option<usize> {
        self.qud_to_segment.get(qud).copied()
    }

    pub fn segment_to_quds(&self) -> &[Vec<usize>] {
        &self.segment_to_quds
    }

    pub fn qud_to_segment(&self) -> &[usize] {
        &self.qud_to_segment
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// A raw input document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: usize,
    pub text: String,
}

impl Document {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Calculate SHA-256 hash of the raw text.
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// RAW -> PREPROCESSED: number the sentences.
    pub fn preprocess(self, tokenizer: &dyn SentenceTokenizer) -> Result<NumberedDocument> {
        let (numbered_text, sentence_map) =
            number_text(&self.text, tokenizer).map_err(|e| QudSimError::Preprocessing {
                document: self.id,
                reason: e.to_string(),
            })?;

        if sentence_map.is_empty() {
            return Err(QudSimError::Preprocessing {
                document: self.id,
                reason: "document contains no sentences".to_string(),
            });
        }

        Ok(NumberedDocument {
            id: self.id,
            content_hash: Self::hash_content(&self.text),
            numbered_text,
            sentence_map,
        })
    }
}

/// A document whose sentences have been numbered.
#[derive(Debug, Clone)]
pub struct NumberedDocument {
    pub id: usize,
    pub content_hash: String,
    pub numbered_text: String,
    pub sentence_map: SentenceMap,
}

/// Output of the generation stage, before index validation.
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub segmentation: Segmentation,
    pub abstracted_segments: Option<Vec<String>>,

    /// QUD strings per segment, in segment order
    pub quds_per_segment: Vec<Vec<String>>,
}

/// A fully prepared, immutable document ready for pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedDocument {
    pub id: usize,
    pub content_hash: String,
    pub sentence_map: SentenceMap,
    pub numbered_text: String,
    pub segmentation: Segmentation,
    pub segment_texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstracted_segments: Option<Vec<String>>,
    pub quds: Vec<Qud>,
    pub qud_index: QudIndex,
}

impl PreparedDocument {
    /// GENERATED -> READY: flatten the QUDs and validate the index once.
    pub fn assemble(
        numbered: NumberedDocument,
        artifacts: GeneratedArtifacts,
    ) -> std::result::Result<Self, ValidationError> {
        let GeneratedArtifacts {
            segmentation,
            abstracted_segments,
            quds_per_segment,
        } = artifacts;

        if quds_per_segment.len() != segmentation.len() {
            return Err(ValidationError::CountMismatch {
                expected: segmentation.len(),
                found: quds_per_segment.len(),
            });
        }

        let counts: Vec<usize> = quds_per_segment.iter().map(Vec::len).collect();
        let qud_index = QudIndex::from_counts(&counts)?;

        let quds = quds_per_segment
            .into_iter()
            .enumerate()
            .flat_map(|(segment, questions)| {
                questions
                    .into_iter()
                    .map(move |question| Qud { question, segment })
            })
            .collect();

        let segment_texts = segmentation.texts(&numbered.sentence_map);

        Ok(Self {
            id: numbered.id,
            content_hash: numbered.content_hash,
            sentence_map: numbered.sentence_map,
            numbered_text: numbered.numbered_text,
            segmentation,
            segment_texts,
            abstracted_segments,
            quds,
            qud_index,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.segmentation.len()
    }

    pub fn num_sentences(&self) -> usize {
        self.sentence_map.len()
    }

    /// Text of segment `index`.
    pub fn segment_text(&self, index: usize) -> Option<&str> {
        self.segment_texts.get(index).map(String::as_str)
    }

    /// Segment containing `sentence`.
    pub fn segment_of(&self, sentence: usize) -> Option<usize> {
        self.segmentation.segment_of(sentence)
    }

    /// QUD questions in index order.
    pub fn questions(&self) -> Vec<&str> {
        self.quds.iter().map(|q| q.question.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(sentences: &[&str]) -> SentenceMap {
        SentenceMap::new(sentences.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_sentence_map_is_one_indexed() {
        let sentences = map(&["A.", "B.", "C."]);

        assert_eq!(sentences.get(0), None);
        assert_eq!(sentences.get(1), Some("A."));
        assert_eq!(sentences.get(3), Some("C."));
        assert_eq!(sentences.get(4), None);
        assert_eq!(sentences.numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let sentences = map(&["A.", "B."]);

        assert_eq!(sentences.resolve(2), Some(2));
        assert_eq!(sentences.resolve(0), None);
        assert_eq!(sentences.resolve(-1), None);
        assert_eq!(sentences.resolve(3), None);
    }

    #[test]
    fn test_numbered_text() {
        assert_eq!(map(&["A.", "B."]).numbered_text(), "[1] A.[2] B.");
    }

    #[test]
    fn test_sentence_map_json_roundtrip_keys() {
        let sentences = map(&["A.", "B."]);
        let json = serde_json::to_value(&sentences).unwrap();
        assert_eq!(json["1"], "A.");
        assert_eq!(json["2"], "B.");

        let back: SentenceMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, sentences);
    }

    #[test]
    fn test_sentence_map_rejects_gaps() {
        let result = serde_json::from_str::<SentenceMap>(r#"{"1": "A.", "3": "C."}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_qud_index_assignment() {
        let index = QudIndex::from_counts(&[2, 1, 3]).unwrap();

        assert_eq!(index.num_segments(), 3);
        assert_eq!(index.num_quds(), 6);
        assert_eq!(index.quds_of(0), &[0, 1]);
        assert_eq!(index.quds_of(1), &[2]);
        assert_eq!(index.quds_of(2), &[3, 4, 5]);
        assert_eq!(index.quds_of(7), &[] as &[usize]);

        // qud_to_segment is the exact inverse
        for segment in 0..index.num_segments() {
            for &qud in index.quds_of(segment) {
                assert_eq!(index.segment_of(qud), Some(segment));
            }
        }
    }

    #[test]
    fn test_qud_index_rejects_empty_segment() {
        assert_eq!(
            QudIndex::from_counts(&[1, 0]),
            Err(ValidationError::NoQuds)
        );
    }

    #[test]
    fn test_assemble_prepared_document() {
        let numbered = NumberedDocument {
            id: 4,
            content_hash: Document::hash_content("A. B. C."),
            numbered_text: "[1] A.[2] B.[3] C.".to_string(),
            sentence_map: map(&["A.", "B.", "C."]),
        };
        let artifacts = GeneratedArtifacts {
            segmentation: Segmentation::new(vec![Segment::new(vec![1, 2]), Segment::new(vec![3])]),
            abstracted_segments: None,
            quds_per_segment: vec![vec!["Q1".into(), "Q2".into()], vec!["Q3".into()]],
        };

        let doc = PreparedDocument::assemble(numbered, artifacts).unwrap();

        assert_eq!(doc.id, 4);
        assert_eq!(doc.segment_texts, vec!["A. B.", "C."]);
        assert_eq!(doc.quds[2].segment, 1);
        assert_eq!(doc.questions(), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(doc.segment_of(3), Some(1));
        assert_eq!(doc.content_hash.len(), 64);
    }
}
