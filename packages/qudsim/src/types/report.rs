//! Output artifact of an alignment run.
//!
//! Documents are serialized once in [`AlignmentReport::documents`]; pairs
//! refer to them by id only, so the report is a plain tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    answer::AnswerSet,
    config::QudSimConfig,
    document::{DocumentStage, PreparedDocument},
    matrix::{AlignmentMatrix, ScoreMatrix},
};

/// One aligned segment pair and its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSegments {
    pub source_segment: usize,
    pub target_segment: usize,
    pub source_text: String,
    pub target_text: String,
}

/// Alignment result for one document pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAlignment {
    pub source_id: usize,
    pub target_id: usize,

    /// Source QUDs answered against the target document
    pub source_answers: AnswerSet,

    /// Target QUDs answered against the source document
    pub target_answers: AnswerSet,

    /// `num_source_segments x num_target_segments`, entries in `[0, 1]`
    pub harmonic_scores: ScoreMatrix,

    /// `harmonic_scores` thresholded to 0/1
    pub alignment_matrix: AlignmentMatrix,

    pub aligned_segment_text: Vec<AlignedSegments>,

    /// Mean over source segments of their best harmonic score
    pub document_similarity: f64,
}

/// A document excluded from pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedDocument {
    pub id: usize,

    /// Last stage the document reached before failing
    pub stage: DocumentStage,
    pub reason: String,
}

/// A pair excluded from the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedPair {
    pub source_id: usize,
    pub target_id: usize,
    pub reason: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub config: QudSimConfig,
    pub documents: Vec<PreparedDocument>,
    #[serde(default)]
    pub dropped_documents: Vec<DroppedDocument>,
    pub pairs: Vec<PairAlignment>,
    #[serde(default)]
    pub dropped_pairs: Vec<DroppedPair>,
}

impl AlignmentReport {
    pub fn new(config: QudSimConfig) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            created_at: Utc::now(),
            config,
            documents: Vec::new(),
            dropped_documents: Vec::new(),
            pairs: Vec::new(),
            dropped_pairs: Vec::new(),
        }
    }

    /// Final lifecycle stage of input document `id`: `Ready` if it was
    /// paired, `Failed` if it was dropped.
    pub fn stage_of(&self, id: usize) -> Option<DocumentStage> {
        if self.documents.iter().any(|d| d.id == id) {
            Some(DocumentStage::Ready)
        } else if self.dropped_documents.iter().any(|d| d.id == id) {
            Some(DocumentStage::Failed)
        } else {
            None
        }
    }

    /// Look up the result for a pair, in either orientation.
    pub fn pair(&self, a: usize, b: usize) -> Option<&PairAlignment> {
        self.pairs.iter().find(|p| {
            (p.source_id == a && p.target_id == b) || (p.source_id == b && p.target_id == a)
        })
    }

    pub fn document(&self, id: usize) -> Option<&PreparedDocument> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::prepared_document;

    #[test]
    fn test_stage_of_ready_and_failed_documents() {
        let mut report = AlignmentReport::new(QudSimConfig::default());
        report
            .documents
            .push(prepared_document(0, &["A."], &[&[1]], &[&["Q?"]]).unwrap());
        report.dropped_documents.push(DroppedDocument {
            id: 1,
            stage: DocumentStage::Generated,
            reason: "QUD index does not cover segment 0".to_string(),
        });

        assert_eq!(report.stage_of(0), Some(DocumentStage::Ready));
        assert_eq!(report.stage_of(1), Some(DocumentStage::Failed));
        assert_eq!(report.stage_of(2), None);
    }
}
