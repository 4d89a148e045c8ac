//! Cross-answering: pose one document's QUDs against another document.

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::pipeline::prompts::{format_answer_prompt, ANSWER_PROMPT};
use crate::pipeline::retry::{request_for, request_validated, RetryPolicy};
use crate::pipeline::schema::AnswerResponse;
use crate::traits::capability::{Capability, Task};
use crate::types::answer::{AnswerExcerpt, AnswerSet};

/// Accept exactly one excerpt per question.
///
/// Citations are not range-checked here; scoring ignores the ones outside
/// the target document.
pub fn validate_answers(
    response: AnswerResponse,
    expected: usize,
) -> std::result::Result<AnswerSet, ValidationError> {
    if response.excerpts.len() != expected {
        return Err(ValidationError::CountMismatch {
            expected,
            found: response.excerpts.len(),
        });
    }

    Ok(AnswerSet::new(
        response.excerpts.into_iter().map(AnswerExcerpt::from).collect(),
    ))
}

/// Answer `questions` against the numbered text of the target document.
pub async fn answer_quds<C: Capability + ?Sized>(
    capability: &C,
    target_numbered_text: &str,
    questions: &[&str],
    target_sentence_count: usize,
    model: &str,
    policy: RetryPolicy,
) -> Result<AnswerSet> {
    let request = request_for::<AnswerResponse>(
        Task::CrossAnswer,
        model,
        ANSWER_PROMPT,
        format_answer_prompt(target_numbered_text, questions),
    );

    let expected = questions.len();
    let answers = request_validated(capability, &request, policy, |response| {
        validate_answers(response, expected)
    })
    .await?;

    for (qud, excerpt) in answers.iter().enumerate() {
        let ignored = excerpt.out_of_range(target_sentence_count);
        if !ignored.is_empty() {
            debug!(
                qud,
                ignored = ?ignored,
                target_sentences = target_sentence_count,
                "Ignoring out-of-range citations"
            );
        }
    }

    Ok(answers)
}
