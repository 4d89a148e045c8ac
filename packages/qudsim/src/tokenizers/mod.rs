//! Sentence tokenizer implementations.

use unicode_segmentation::UnicodeSegmentation;

use crate::traits::tokenizer::{SentenceTokenizer, TokenizeError};

/// Splits on UAX #29 sentence boundaries.
///
/// Sentences are trimmed; whitespace-only pieces are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceTokenizer;

impl SentenceTokenizer for UnicodeSentenceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError> {
        Ok(text
            .unicode_sentences()
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_sentences() {
        let sentences = UnicodeSentenceTokenizer
            .tokenize("The storm hit at dawn. Nobody was ready!  Was anyone warned?")
            .unwrap();

        assert_eq!(
            sentences,
            vec!["The storm hit at dawn.", "Nobody was ready!", "Was anyone warned?"]
        );
    }

    #[test]
    fn test_paragraph_breaks_and_blank_input() {
        let sentences = UnicodeSentenceTokenizer
            .tokenize("First paragraph.\n\nSecond paragraph.")
            .unwrap();
        assert_eq!(sentences, vec!["First paragraph.", "Second paragraph."]);

        assert!(UnicodeSentenceTokenizer.tokenize("   \n ").unwrap().is_empty());
    }
}
