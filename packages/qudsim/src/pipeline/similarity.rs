//! Frequency-based segment similarity.
//!
//! Per direction (source QUDs answered against the target):
//!
//! 1. **Stage A** ([`qud_overlap`]): `num_quds x num_target_segments`, each
//!    cell the share of the QUD's cited sentences inside that target segment.
//! 2. **Stage B** ([`segment_scores`]): rows of Stage A averaged per source
//!    segment, giving `num_source_segments x num_target_segments`.
//!
//! Both directions are then combined cell by cell with the harmonic mean
//! ([`harmonic_similarity`]) and thresholded ([`threshold_alignment`]).
//!
//! Everything here is pure and deterministic.

use ndarray::{Array2, Axis, Zip};
use std::collections::BTreeSet;

use crate::error::{QudSimError, Result};
use crate::types::answer::AnswerSet;
use crate::types::document::{PreparedDocument, QudIndex, Segmentation};
use crate::types::matrix::{AlignmentMatrix, ScoreMatrix};

/// Stage A: share of each QUD's cited evidence per target segment.
///
/// Negative citations, citations above `target_sentence_count` and repeated
/// citations are ignored. A citation of 0 matches no segment but still counts
/// toward the QUD's total. A QUD with no remaining citation gets an all-zero
/// row.
pub fn qud_overlap(
    answers: &AnswerSet,
    target: &Segmentation,
    target_sentence_count: usize,
) -> ScoreMatrix {
    let segment_sets: Vec<BTreeSet<usize>> =
        target.iter().map(|segment| segment.sentence_set()).collect();
    let mut scores = Array2::<f64>::zeros((answers.len(), segment_sets.len()));

    for (row, excerpt) in answers.iter().enumerate() {
        let cited = excerpt.cited_sentences(target_sentence_count);
        if cited.is_empty() {
            continue;
        }

        let total = cited.len() as f64;
        for (col, sentences) in segment_sets.iter().enumerate() {
            let shared = cited.intersection(sentences).count();
            scores[[row, col]] = shared as f64 / total;
        }
    }

    ScoreMatrix::from_array(scores)
}

/// Stage B: average the Stage A rows of each source segment's QUDs.
pub fn segment_scores(qud_scores: &ScoreMatrix, source_index: &QudIndex) -> Result<ScoreMatrix> {
    let (rows, cols) = qud_scores.shape();
    if rows != source_index.num_quds() {
        return Err(QudSimError::ShapeMismatch {
            context: "QUD overlap rows",
            expected: (source_index.num_quds(), cols),
            found: (rows, cols),
        });
    }

    let qud_rows = qud_scores.as_array();
    let mut scores = Array2::<f64>::zeros((source_index.num_segments(), cols));

    for (segment, mut row) in scores.axis_iter_mut(Axis(0)).enumerate() {
        let quds = source_index.quds_of(segment);
        if quds.is_empty() {
            continue;
        }
        if let Some(mean) = qud_rows.select(Axis(0), quds).mean_axis(Axis(0)) {
            row.assign(&mean);
        }
    }

    Ok(ScoreMatrix::from_array(scores))
}

/// Stage A then Stage B for one direction.
///
/// `answers` holds the source's QUDs answered against `target`.
pub fn directional_similarity(
    answers: &AnswerSet,
    source: &PreparedDocument,
    target: &PreparedDocument,
) -> Result<ScoreMatrix> {
    if answers.len() != source.qud_index.num_quds() {
        return Err(QudSimError::ShapeMismatch {
            context: "answer set",
            expected: (source.qud_index.num_quds(), target.num_segments()),
            found: (answers.len(), target.num_segments()),
        });
    }

    let overlap = qud_overlap(answers, &target.segmentation, target.num_sentences());
    segment_scores(&overlap, &source.qud_index)
}

/// Combine `source_to_target` (`s x t`) with `target_to_source` (`t x s`).
///
/// `H[i][j] = 2ab / (a + b)` with `a = source_to_target[i][j]`,
/// `b = target_to_source[j][i]`; a zero denominator is replaced by 1.
pub fn harmonic_similarity(
    source_to_target: &ScoreMatrix,
    target_to_source: &ScoreMatrix,
) -> Result<ScoreMatrix> {
    let (rows, cols) = source_to_target.shape();
    if target_to_source.shape() != (cols, rows) {
        return Err(QudSimError::ShapeMismatch {
            context: "reverse directional scores",
            expected: (cols, rows),
            found: target_to_source.shape(),
        });
    }

    let mut harmonic = Array2::<f64>::zeros((rows, cols));
    Zip::from(&mut harmonic)
        .and(source_to_target.as_array())
        .and(target_to_source.as_array().t())
        .for_each(|h, &a, &b| {
            let denominator = a + b;
            let denominator = if denominator == 0.0 { 1.0 } else { denominator };
            *h = 2.0 * a * b / denominator;
        });

    Ok(ScoreMatrix::from_array(harmonic))
}

/// Cells at or above `threshold` are aligned.
pub fn threshold_alignment(harmonic: &ScoreMatrix, threshold: f64) -> AlignmentMatrix {
    AlignmentMatrix::from_array(harmonic.as_array().mapv(|score| u8::from(score >= threshold)))
}

/// Mean over rows of the row maximum; 0.0 for an empty matrix.
pub fn document_similarity(harmonic: &ScoreMatrix) -> f64 {
    let (rows, cols) = harmonic.shape();
    if rows == 0 || cols == 0 {
        return 0.0;
    }

    let total: f64 = harmonic
        .as_array()
        .axis_iter(Axis(0))
        .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .sum();
    total / rows as f64
}
