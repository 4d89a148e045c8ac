//! QudSim - main entry point for document alignment.
//!
//! Drives every document through `RAW -> PREPROCESSED -> READY`, pairs all
//! ready documents and aligns each pair:
//!
//! ```text
//! documents ──► number ──► segment ──► (abstract) ──► QUDs ──► PreparedDocument
//!                                                                   │
//!           pairs (i < j) ◄─────────────────────────────────────────┘
//!             │
//!             ├─► answer source QUDs against target ─┐
//!             ├─► answer target QUDs against source ─┤
//!             ▼                                      ▼
//!         directional scores (both ways) ──► harmonic mean ──► threshold
//! ```
//!
//! Failed documents and pairs are dropped and recorded in the report; the
//! run fails only when too little survives.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{QudSimError, Result};
use crate::pipeline::answer::answer_quds;
use crate::pipeline::qud::generate_document;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::similarity::{
    directional_similarity, document_similarity, harmonic_similarity, threshold_alignment,
};
use crate::tokenizers::UnicodeSentenceTokenizer;
use crate::traits::{capability::Capability, tokenizer::SentenceTokenizer};
use crate::types::{
    config::QudSimConfig,
    document::{Document, DocumentStage, PreparedDocument},
    report::{AlignedSegments, AlignmentReport, DroppedDocument, DroppedPair, PairAlignment},
};

/// The alignment engine.
///
/// `G` serves segmentation, abstraction and QUD generation; `A` serves
/// cross-answering. They may be the same backend.
///
/// # Example
///
/// ```rust,ignore
/// let qudsim = QudSim::new(generator, answerer, QudSimConfig::default());
///
/// let report = qudsim.run(&[story_a, story_b, story_c]).await?;
/// for pair in &report.pairs {
///     println!("{} ~ {}: {:.2}", pair.source_id, pair.target_id, pair.document_similarity);
/// }
/// ```
pub struct QudSim<G, A = G, T = UnicodeSentenceTokenizer> {
    generator: G,
    answerer: A,
    tokenizer: T,
    config: QudSimConfig,
}

impl<G: Capability, A: Capability> QudSim<G, A, UnicodeSentenceTokenizer> {
    /// Create an engine with the default sentence tokenizer.
    pub fn new(generator: G, answerer: A, config: QudSimConfig) -> Self {
        Self {
            generator,
            answerer,
            tokenizer: UnicodeSentenceTokenizer,
            config,
        }
    }
}

impl<G, A, T> QudSim<G, A, T> {
    /// Replace the sentence tokenizer.
    pub fn with_tokenizer<U: SentenceTokenizer>(self, tokenizer: U) -> QudSim<G, A, U> {
        QudSim {
            generator: self.generator,
            answerer: self.answerer,
            tokenizer,
            config: self.config,
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &QudSimConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut QudSimConfig {
        &mut self.config
    }
}

impl<G: Capability, A: Capability, T: SentenceTokenizer> QudSim<G, A, T> {
    /// Align every pair of `documents`.
    ///
    /// Documents are identified by their position in the input. Output
    /// order follows input order whatever the concurrency.
    pub async fn run<S: AsRef<str>>(&self, documents: &[S]) -> Result<AlignmentReport> {
        self.config.validate()?;
        if documents.len() < 2 {
            return Err(QudSimError::config(
                "documents",
                format!("at least 2 documents are required, got {}", documents.len()),
            ));
        }

        let mut report = AlignmentReport::new(self.config.clone());
        info!(
            run_id = %report.run_id,
            documents = documents.len(),
            level = u8::from(self.config.level),
            threshold = self.config.threshold,
            "Starting alignment run"
        );

        let prepared: Vec<_> = stream::iter(documents.iter().enumerate())
            .map(|(id, text)| self.prepare(id, text.as_ref()))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        for (id, outcome) in prepared.into_iter().enumerate() {
            match outcome {
                Ok(document) => report.documents.push(document),
                Err((_, QudSimError::Cancelled)) => return Err(QudSimError::Cancelled),
                Err((stage, e)) => {
                    warn!(document = id, stage = %stage, error = %e, "Dropping document");
                    report.dropped_documents.push(DroppedDocument {
                        id,
                        stage,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.documents.len() < 2 {
            return Err(QudSimError::InsufficientInput {
                stage: "document preparation",
                required: 2,
                available: report.documents.len(),
            });
        }

        let ready = &report.documents;
        let pairs: Vec<(usize, usize)> = (0..ready.len())
            .flat_map(|i| (i + 1..ready.len()).map(move |j| (i, j)))
            .collect();

        let aligned: Vec<_> = stream::iter(pairs.iter())
            .map(|&(i, j)| self.align_pair(&ready[i], &ready[j]))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let mut results = Vec::with_capacity(aligned.len());
        let mut dropped = Vec::new();
        for (&(i, j), outcome) in pairs.iter().zip(aligned) {
            let (source_id, target_id) = (ready[i].id, ready[j].id);
            match outcome {
                Ok(pair) => results.push(pair),
                Err(QudSimError::Cancelled) => return Err(QudSimError::Cancelled),
                Err(e) => {
                    warn!(source = source_id, target = target_id, error = %e, "Dropping pair");
                    dropped.push(DroppedPair {
                        source_id,
                        target_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.pairs = results;
        report.dropped_pairs = dropped;

        if report.pairs.is_empty() {
            return Err(QudSimError::InsufficientInput {
                stage: "alignment",
                required: 1,
                available: 0,
            });
        }

        info!(
            run_id = %report.run_id,
            documents = report.documents.len(),
            dropped_documents = report.dropped_documents.len(),
            pairs = report.pairs.len(),
            dropped_pairs = report.dropped_pairs.len(),
            "Alignment run complete"
        );
        Ok(report)
    }

    /// Run with cancellation support.
    pub async fn run_with_cancel<S: AsRef<str>>(
        &self,
        documents: &[S],
        cancel: CancellationToken,
    ) -> Result<AlignmentReport> {
        tokio::select! {
            result = self.run(documents) => result,
            _ = cancel.cancelled() => Err(QudSimError::Cancelled),
        }
    }

    /// PRIMITIVE: Take one raw document to READY.
    pub async fn prepare_document(&self, id: usize, text: &str) -> Result<PreparedDocument> {
        self.prepare(id, text).await.map_err(|(_, e)| e)
    }

    /// PRIMITIVE: Align two prepared documents.
    ///
    /// Both cross-answer directions must succeed.
    pub async fn align_pair(
        &self,
        source: &PreparedDocument,
        target: &PreparedDocument,
    ) -> Result<PairAlignment> {
        let policy = RetryPolicy::from(&self.config);
        let model = self.config.answer_model.as_str();
        let source_questions = source.questions();
        let target_questions = target.questions();

        let forward = answer_quds(
            &self.answerer,
            &target.numbered_text,
            &source_questions,
            target.num_sentences(),
            model,
            policy,
        );
        let backward = answer_quds(
            &self.answerer,
            &source.numbered_text,
            &target_questions,
            source.num_sentences(),
            model,
            policy,
        );

        let (source_answers, target_answers) = if self.config.concurrency > 1 {
            futures::try_join!(forward, backward)?
        } else {
            (forward.await?, backward.await?)
        };

        let forward_scores = directional_similarity(&source_answers, source, target)?;
        let backward_scores = directional_similarity(&target_answers, target, source)?;
        let harmonic_scores = harmonic_similarity(&forward_scores, &backward_scores)?;
        let alignment_matrix = threshold_alignment(&harmonic_scores, self.config.threshold);

        let aligned_segment_text: Vec<AlignedSegments> = alignment_matrix
            .aligned_cells()
            .into_iter()
            .map(|(i, j)| AlignedSegments {
                source_segment: i,
                target_segment: j,
                source_text: source.segment_text(i).unwrap_or_default().to_string(),
                target_text: target.segment_text(j).unwrap_or_default().to_string(),
            })
            .collect();

        let similarity = document_similarity(&harmonic_scores);

        info!(
            source = source.id,
            target = target.id,
            aligned = aligned_segment_text.len(),
            similarity,
            "Pair aligned"
        );

        Ok(PairAlignment {
            source_id: source.id,
            target_id: target.id,
            source_answers,
            target_answers,
            harmonic_scores,
            alignment_matrix,
            aligned_segment_text,
            document_similarity: similarity,
        })
    }

    /// Prepare one document, reporting the last stage reached on failure.
    async fn prepare(
        &self,
        id: usize,
        text: &str,
    ) -> std::result::Result<PreparedDocument, (DocumentStage, QudSimError)> {
        let numbered = Document::new(id, text)
            .preprocess(&self.tokenizer)
            .map_err(|e| (DocumentStage::Raw, e))?;

        debug!(
            document = id,
            sentences = numbered.sentence_map.len(),
            stage = %DocumentStage::Preprocessed,
            "Document numbered"
        );

        generate_document(&self.generator, numbered, &self.config)
            .await
            .map_err(|e| (stage_at_failure(&e), e))
    }
}

/// Last stage reached by a document whose generation step failed.
///
/// A `Validation` error means every artifact was generated but the QUD
/// index did not check out against the segmentation.
fn stage_at_failure(error: &QudSimError) -> DocumentStage {
    match error {
        QudSimError::Validation(_) => DocumentStage::Generated,
        _ => DocumentStage::Preprocessed,
    }
}
