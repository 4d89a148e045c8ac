//! Sentence tokenizer seam.

use thiserror::Error;

/// Tokenizer failure. Turns into a preprocessing failure for the document.
#[derive(Debug, Error)]
#[error("sentence tokenization failed: {0}")]
pub struct TokenizeError(pub String);

/// Splits raw text into an ordered sequence of sentences.
#[cfg_attr(test, mockall::automock)]
pub trait SentenceTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, TokenizeError>;
}
