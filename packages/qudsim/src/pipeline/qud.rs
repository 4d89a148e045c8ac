//! QUD generation and the per-document generation stage.

use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::pipeline::abstraction::abstract_segments;
use crate::pipeline::prompts::QUD_PROMPT;
use crate::pipeline::retry::{request_for, request_validated, RetryPolicy};
use crate::pipeline::schema::QudResponse;
use crate::pipeline::segment::segment_document;
use crate::traits::capability::{Capability, Task};
use crate::types::config::{AbstractionLevel, QudSimConfig};
use crate::types::document::{GeneratedArtifacts, NumberedDocument, PreparedDocument};

/// Keep the non-blank questions; reject a response with none.
///
/// `num_quds` is not checked against the list.
pub fn validate_quds(response: QudResponse) -> std::result::Result<Vec<String>, ValidationError> {
    let quds: Vec<String> = response
        .quds
        .into_iter()
        .map(|item| item.qud.trim().to_string())
        .filter(|qud| !qud.is_empty())
        .collect();

    if quds.is_empty() {
        return Err(ValidationError::NoQuds);
    }
    Ok(quds)
}

/// Generate the QUDs of a single segment.
pub async fn generate_quds<C: Capability + ?Sized>(
    capability: &C,
    segment_text: &str,
    model: &str,
    policy: RetryPolicy,
) -> Result<Vec<String>> {
    let request = request_for::<QudResponse>(
        Task::QudGeneration,
        model,
        QUD_PROMPT,
        segment_text.to_string(),
    );

    request_validated(capability, &request, policy, validate_quds).await
}

/// PREPROCESSED -> READY: segment, optionally abstract, generate QUDs and
/// validate the resulting index.
///
/// Any failed step fails the whole document.
pub async fn generate_document<C: Capability + ?Sized>(
    capability: &C,
    document: NumberedDocument,
    config: &QudSimConfig,
) -> Result<PreparedDocument> {
    let policy = RetryPolicy::from(config);
    let model = config.generation_model.as_str();

    let (segmentation, segment_texts) = segment_document(
        capability,
        &document,
        model,
        policy,
        config.allow_segment_overlap,
    )
    .await?;

    let abstracted_segments = match config.level {
        AbstractionLevel::Specific => None,
        AbstractionLevel::Abstract => {
            Some(abstract_segments(capability, &segment_texts, model, policy).await?)
        }
    };

    let sources = abstracted_segments.as_deref().unwrap_or(&segment_texts);
    let mut quds_per_segment = Vec::with_capacity(sources.len());
    for (segment, text) in sources.iter().enumerate() {
        let quds = generate_quds(capability, text, model, policy).await?;
        debug!(
            document = document.id,
            segment,
            quds = quds.len(),
            "QUDs generated"
        );
        quds_per_segment.push(quds);
    }

    let id = document.id;
    let prepared = PreparedDocument::assemble(
        document,
        GeneratedArtifacts {
            segmentation,
            abstracted_segments,
            quds_per_segment,
        },
    )?;

    info!(
        document = id,
        segments = prepared.num_segments(),
        quds = prepared.quds.len(),
        "Document ready"
    );

    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QudSimError;
    use crate::pipeline::schema::ResponseShape;
    use crate::testing::{
        abstraction_json, numbered_document, qud_json, segmentation_json, MockCapability,
        MockResponse,
    };
    use serde_json::json;

    #[test]
    fn test_blank_quds_discarded() {
        let response = QudResponse::parse(json!({
            "num_quds": 3,
            "quds": [{"qud": "  "}, {"qud": " What happened? "}, {"qud": ""}]
        }))
        .unwrap();

        assert_eq!(validate_quds(response).unwrap(), vec!["What happened?"]);
    }

    #[test]
    fn test_all_blank_rejected() {
        let response = QudResponse::parse(json!({"num_quds": 1, "quds": [{"qud": " "}]})).unwrap();
        assert_eq!(validate_quds(response), Err(ValidationError::NoQuds));
    }

    #[tokio::test]
    async fn test_generate_document_specific_level() {
        let document = numbered_document(7, &["A.", "B.", "C."]);
        let mock = MockCapability::new()
            .with_responses(
                Task::Segmentation,
                vec![MockResponse::Value(segmentation_json(&[&[1, 2], &[3]]))],
            )
            .with_responses(
                Task::QudGeneration,
                vec![
                    MockResponse::Value(qud_json(&["Q1?", "Q2?"])),
                    MockResponse::Value(qud_json(&["Q3?"])),
                ],
            );

        let prepared = generate_document(&mock, document, &QudSimConfig::default())
            .await
            .unwrap();

        assert_eq!(prepared.id, 7);
        assert_eq!(prepared.questions(), vec!["Q1?", "Q2?", "Q3?"]);
        assert_eq!(prepared.qud_index.quds_of(0), &[0, 1]);
        assert_eq!(prepared.qud_index.quds_of(1), &[2]);
        assert!(prepared.abstracted_segments.is_none());

        let prompts: Vec<String> = mock
            .calls()
            .into_iter()
            .filter(|call| call.task == Task::QudGeneration)
            .map(|call| call.prompt)
            .collect();
        assert_eq!(prompts, vec!["A. B.", "C."]);
    }

    #[tokio::test]
    async fn test_generate_document_abstract_level_uses_paragraphs() {
        let document = numbered_document(0, &["Ann sailed.", "Bob stayed."]);
        let mock = MockCapability::new()
            .with_responses(
                Task::Segmentation,
                vec![MockResponse::Value(segmentation_json(&[&[1], &[2]]))],
            )
            .with_responses(
                Task::Abstraction,
                vec![MockResponse::Value(abstraction_json(&["Someone leaves.", "Someone remains."]))],
            )
            .with_responses(
                Task::QudGeneration,
                vec![
                    MockResponse::Value(qud_json(&["Who leaves?"])),
                    MockResponse::Value(qud_json(&["Who remains?"])),
                ],
            );

        let config = QudSimConfig::default().with_level(AbstractionLevel::Abstract);
        let prepared = generate_document(&mock, document, &config).await.unwrap();

        assert_eq!(
            prepared.abstracted_segments.as_deref(),
            Some(&["Someone leaves.".to_string(), "Someone remains.".to_string()][..])
        );
        assert_eq!(prepared.segment_texts, vec!["Ann sailed.", "Bob stayed."]);

        let qud_prompts: Vec<String> = mock
            .calls()
            .into_iter()
            .filter(|call| call.task == Task::QudGeneration)
            .map(|call| call.prompt)
            .collect();
        assert_eq!(qud_prompts, vec!["Someone leaves.", "Someone remains."]);
    }

    #[tokio::test]
    async fn test_one_failed_segment_fails_document() {
        let document = numbered_document(0, &["A.", "B."]);
        let mock = MockCapability::new()
            .with_responses(
                Task::Segmentation,
                vec![MockResponse::Value(segmentation_json(&[&[1], &[2]]))],
            )
            .with_responses(
                Task::QudGeneration,
                vec![
                    MockResponse::Value(qud_json(&["Q1?"])),
                    MockResponse::Value(qud_json(&[])),
                ],
            );

        let config = QudSimConfig::default().with_max_tries(1);
        let err = generate_document(&mock, document, &config).await.unwrap_err();

        assert!(matches!(
            err,
            QudSimError::GenerationExhausted {
                task: Task::QudGeneration,
                ..
            }
        ));
    }
}
