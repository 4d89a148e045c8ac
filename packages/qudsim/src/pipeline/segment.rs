//! Atomic-topic segmentation.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::pipeline::prompts::{format_segment_prompt, SEGMENT_PROMPT};
use crate::pipeline::retry::{request_for, request_validated, RetryPolicy};
use crate::pipeline::schema::SegmentationResponse;
use crate::traits::capability::{Capability, Task};
use crate::types::document::{NumberedDocument, Segment, Segmentation, SentenceMap};

/// Check a segmentation response against the document's sentences.
///
/// Accepted when every sentence is covered, every cited number exists and no
/// segment is empty. Unless `allow_overlap` is set, a sentence may also
/// belong to one segment only. Repeated numbers inside a single segment are
/// collapsed.
pub fn validate_segmentation(
    response: SegmentationResponse,
    sentence_map: &SentenceMap,
    allow_overlap: bool,
) -> std::result::Result<Segmentation, ValidationError> {
    if response.segmentation.is_empty() {
        return Err(ValidationError::EmptyResponse);
    }

    let mut segments = Vec::with_capacity(response.segmentation.len());
    let mut unknown = Vec::new();
    let mut owners: BTreeMap<usize, usize> = BTreeMap::new();

    for (index, item) in response.segmentation.into_iter().enumerate() {
        if item.sentences.is_empty() {
            return Err(ValidationError::EmptySegment(index));
        }

        let mut seen = BTreeSet::new();
        let mut sentences = Vec::with_capacity(item.sentences.len());
        for reference in item.sentences {
            match sentence_map.resolve(reference.0) {
                Some(number) => {
                    if seen.insert(number) {
                        sentences.push(number);
                        *owners.entry(number).or_default() += 1;
                    }
                }
                None => unknown.push(reference.0),
            }
        }
        segments.push(Segment::new(sentences));
    }

    let missing: Vec<usize> = sentence_map
        .numbers()
        .filter(|n| !owners.contains_key(n))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingSentences(missing));
    }

    if !unknown.is_empty() {
        return Err(ValidationError::UnknownSentences(unknown));
    }

    if !allow_overlap {
        let shared: Vec<usize> = owners
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(number, _)| *number)
            .collect();
        if !shared.is_empty() {
            return Err(ValidationError::OverlappingSentences(shared));
        }
    }

    Ok(Segmentation::new(segments))
}

/// Segment a numbered document.
///
/// Returns the accepted segmentation and the text of each segment.
pub async fn segment_document<C: Capability + ?Sized>(
    capability: &C,
    document: &NumberedDocument,
    model: &str,
    policy: RetryPolicy,
    allow_overlap: bool,
) -> Result<(Segmentation, Vec<String>)> {
    let request = request_for::<SegmentationResponse>(
        Task::Segmentation,
        model,
        SEGMENT_PROMPT,
        format_segment_prompt(&document.numbered_text),
    );

    let segmentation = request_validated(capability, &request, policy, |response| {
        validate_segmentation(response, &document.sentence_map, allow_overlap)
    })
    .await?;

    debug!(
        document = document.id,
        segments = segmentation.len(),
        sentences = document.sentence_map.len(),
        "Segmentation accepted"
    );

    let texts = segmentation.texts(&document.sentence_map);
    Ok((segmentation, texts))
}
