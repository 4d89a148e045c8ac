//! Cross-answer evidence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Answer to one QUD, posed against the other document.
///
/// `sentence_nums` is kept exactly as returned; it may cite numbers that do
/// not exist in the answering document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerExcerpt {
    pub question: String,
    pub sentence_nums: Vec<i64>,
    pub sentences: Vec<String>,
}

impl AnswerExcerpt {
    pub fn new(question: impl Into<String>, sentence_nums: Vec<i64>) -> Self {
        Self {
            question: question.into(),
            sentence_nums,
            sentences: Vec::new(),
        }
    }

    /// Distinct cited sentence numbers within `0..=sentence_count`.
    ///
    /// 0 names no sentence, so it never lands in a segment, but it still
    /// counts as cited evidence.
    pub fn cited_sentences(&self, sentence_count: usize) -> BTreeSet<usize> {
        self.sentence_nums
            .iter()
            .filter_map(|n| usize::try_from(*n).ok())
            .filter(|n| *n <= sentence_count)
            .collect()
    }

    /// Cited numbers that are negative or above `sentence_count`.
    pub fn out_of_range(&self, sentence_count: usize) -> Vec<i64> {
        self.sentence_nums
            .iter()
            .copied()
            .filter(|n| usize::try_from(*n).map_or(true, |n| n > sentence_count))
            .collect()
    }
}

/// All answers for one direction of a pair, one excerpt per QUD in QUD order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerSet {
    pub excerpts: Vec<AnswerExcerpt>,
}

impl AnswerSet {
    pub fn new(excerpts: Vec<AnswerExcerpt>) -> Self {
        Self { excerpts }
    }

    pub fn len(&self) -> usize {
        self.excerpts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excerpts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnswerExcerpt> {
        self.excerpts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cited_sentences_drops_invalid_and_duplicates() {
        let excerpt = AnswerExcerpt::new("Q?", vec![2, 2, 0, -3, 5, 9]);

        let cited: Vec<usize> = excerpt.cited_sentences(5).into_iter().collect();
        assert_eq!(cited, vec![0, 2, 5]);
        assert_eq!(excerpt.out_of_range(5), vec![-3, 9]);
    }

    #[test]
    fn test_empty_excerpt() {
        let excerpt = AnswerExcerpt::new("Q?", vec![]);
        assert!(excerpt.cited_sentences(3).is_empty());
        assert!(excerpt.out_of_range(3).is_empty());
    }
}
