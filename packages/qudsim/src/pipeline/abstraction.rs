//! Segment decontextualization for abstract-level QUDs.

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::pipeline::prompts::{format_abstract_prompt, ABSTRACT_PROMPT};
use crate::pipeline::retry::{request_for, request_validated, RetryPolicy};
use crate::pipeline::schema::AbstractionResponse;
use crate::traits::capability::{Capability, Task};

/// Accept exactly one paragraph per segment, in list order.
pub fn validate_abstraction(
    response: AbstractionResponse,
    expected: usize,
) -> std::result::Result<Vec<String>, ValidationError> {
    let paragraphs = response.decontextualized_paragraphs;
    if paragraphs.is_empty() {
        return Err(ValidationError::EmptyResponse);
    }
    if paragraphs.len() != expected {
        return Err(ValidationError::CountMismatch {
            expected,
            found: paragraphs.len(),
        });
    }

    Ok(paragraphs.into_iter().map(|p| p.para).collect())
}

/// Decontextualize every segment of one document.
pub async fn abstract_segments<C: Capability + ?Sized>(
    capability: &C,
    segment_texts: &[String],
    model: &str,
    policy: RetryPolicy,
) -> Result<Vec<String>> {
    let request = request_for::<AbstractionResponse>(
        Task::Abstraction,
        model,
        ABSTRACT_PROMPT,
        format_abstract_prompt(segment_texts),
    );

    let expected = segment_texts.len();
    let paragraphs = request_validated(capability, &request, policy, |response| {
        validate_abstraction(response, expected)
    })
    .await?;

    debug!(paragraphs = paragraphs.len(), "Abstraction accepted");
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::ResponseShape;
    use crate::testing::{abstraction_json, MockCapability, MockResponse};

    #[test]
    fn test_count_mismatch_rejected() {
        let response = AbstractionResponse::parse(abstraction_json(&["One."])).unwrap();
        assert_eq!(
            validate_abstraction(response, 2),
            Err(ValidationError::CountMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_empty_rejected() {
        let response = AbstractionResponse::parse(abstraction_json(&[])).unwrap();
        assert_eq!(
            validate_abstraction(response, 1),
            Err(ValidationError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn test_abstract_segments_keeps_order() {
        let mock = MockCapability::new().with_responses(
            Task::Abstraction,
            vec![
                MockResponse::Value(abstraction_json(&["Only one."])),
                MockResponse::Value(abstraction_json(&["A person travels.", "A loss occurs."])),
            ],
        );

        let segments = vec!["Ann flew to Rome.".to_string(), "Her cat died.".to_string()];
        let paragraphs = abstract_segments(&mock, &segments, "gpt-4o", RetryPolicy::new(2))
            .await
            .unwrap();

        assert_eq!(paragraphs, vec!["A person travels.", "A loss occurs."]);

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].prompt, "[0] Ann flew to Rome.\n\n[1] Her cat died.");
    }
}
