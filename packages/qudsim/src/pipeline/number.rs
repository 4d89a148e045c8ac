//! Sentence numbering.

use crate::traits::tokenizer::{SentenceTokenizer, TokenizeError};
use crate::types::document::SentenceMap;

/// Replace typographic quotes with a straight apostrophe.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Split `text` into 1-indexed sentences and render the numbered text.
///
/// Returns `(numbered_text, sentence_map)`.
pub fn number_text(
    text: &str,
    tokenizer: &dyn SentenceTokenizer,
) -> Result<(String, SentenceMap), TokenizeError> {
    let normalized = normalize_quotes(text);
    let sentence_map = SentenceMap::new(tokenizer.tokenize(&normalized)?);
    let numbered_text = sentence_map.numbered_text();

    Ok((numbered_text, sentence_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::tokenizer::MockSentenceTokenizer;
    use crate::tokenizers::UnicodeSentenceTokenizer;

    #[test]
    fn test_number_text() {
        let (numbered, map) =
            number_text("The cat sat. The dog ran.", &UnicodeSentenceTokenizer).unwrap();

        assert_eq!(numbered, "[1] The cat sat.[2] The dog ran.");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(2), Some("The dog ran."));
    }

    #[test]
    fn test_curly_quotes_are_normalized() {
        assert_eq!(
            normalize_quotes("\u{201C}Hi,\u{201D} she said. It\u{2019}s late."),
            "'Hi,' she said. It's late."
        );
    }

    #[test]
    fn test_tokenizer_receives_normalized_text() {
        let mut tokenizer = MockSentenceTokenizer::new();
        tokenizer
            .expect_tokenize()
            .times(1)
            .returning(|text| Ok(vec![text.to_string()]));

        let (numbered, _) = number_text("\u{201C}Quoted.\u{201D}", &tokenizer).unwrap();
        assert_eq!(numbered, "[1] 'Quoted.'");
    }

    #[test]
    fn test_tokenizer_failure_propagates() {
        let mut tokenizer = MockSentenceTokenizer::new();
        tokenizer
            .expect_tokenize()
            .returning(|_| Err(TokenizeError("model not loaded".into())));

        let err = number_text("Anything.", &tokenizer).unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }
}
