//! Chunked answer-aggregation pipeline.
//!
//! Answers natural-language questions from a user's documents or saved
//! question/answer pairs. The document path fans a question out across
//! worker batches of search chunks, stitches the per-chunk model outputs
//! into one flat buffer, runs span extraction once over that buffer and
//! maps the extracted spans back to document coordinates. All collaborators
//! (stores, reader model, executor) are injected and long-lived; every
//! intermediate structure is request-scoped.

mod answer;
mod combine;
mod config;
mod dispatch;
mod errors;
mod executor;
mod inference;
mod threshold;
mod translate;

pub use answer::{Response, ResponderAnswer, SourceType, assemble};
pub use combine::{ChunkSource, Flattened, PositionIndex, combine};
pub use config::{ExecutorConfig, ResponderConfig, SpeedOrAccuracy};
pub use dispatch::{WorkerBatch, split_batches};
pub use errors::ResponderError;
pub use executor::{
    BatchOutput, ClusterExecutor, HttpDispatch, InferenceCall, InferenceReply, InferenceWorker,
    InlineExecutor, LoopbackDispatch, TaskExecutor, WorkDispatch, executor_from_config,
};
pub use inference::ReaderWorker;
pub use threshold::ThresholdTable;
pub use translate::{TranslatedSpan, translate};

use doc_store::{AnnotationStore, DocumentStore, NewDocument, SavedReplyFilter};
use machine_reader::{ReaderConfig, ReaderModel};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Options for the document answer path.
#[derive(Clone, Debug, Default)]
pub struct DocumentQuery {
    /// Restrict the search to these documents; empty means all of them.
    pub document_ids: Vec<String>,
    /// Ranked results to skip before the returned window.
    pub offset: usize,
    pub number_of_items: usize,
    /// Ad-hoc text to answer from instead of a stored document. A transient
    /// document is created for it and removed after answering.
    pub text: Option<String>,
    /// Named confidence level; unknown names fall back to `MEDIUM` here.
    pub threshold: String,
    /// Overrides the configured speed/accuracy default when set.
    pub speed_or_accuracy: Option<SpeedOrAccuracy>,
}

/// Which stored answers the similar-questions path considers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimilarKind {
    #[default]
    All,
    SavedReply,
    Annotation,
}

/// Options for the similar-questions answer path.
#[derive(Clone, Debug, Default)]
pub struct SimilarQuery {
    pub kind: SimilarKind,
    /// Restrict document-bound annotations to these documents; saved
    /// replies without a document stay visible.
    pub document_ids: Vec<String>,
    /// Named confidence level; unknown names are a hard input error here.
    pub threshold: String,
}

/// The answering facade. Construct once at process start with long-lived
/// collaborators and reuse across requests; switching executor modes means
/// constructing a new `Responder`.
pub struct Responder {
    store: Arc<dyn DocumentStore>,
    annotations: Arc<dyn AnnotationStore>,
    reader: Arc<dyn ReaderModel>,
    executor: Arc<dyn TaskExecutor>,
    config: ResponderConfig,
}

impl Responder {
    /// Wires a responder with an explicit executor.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        annotations: Arc<dyn AnnotationStore>,
        reader: Arc<dyn ReaderModel>,
        executor: Arc<dyn TaskExecutor>,
        config: ResponderConfig,
    ) -> Self {
        info!(
            "responder::new workers_per_request={}",
            config.executor.workers_per_request
        );
        Self {
            store,
            annotations,
            reader,
            executor,
            config,
        }
    }

    /// Wires a responder with the executor selected by `config.executor`:
    /// inline when distributed mode is off, cluster dispatch when it is on.
    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        annotations: Arc<dyn AnnotationStore>,
        reader: Arc<dyn ReaderModel>,
        config: ResponderConfig,
    ) -> Result<Self, ResponderError> {
        let worker = Arc::new(ReaderWorker::new(reader.clone()));
        let executor = executor_from_config(&config.executor, worker)?;
        Ok(Self::new(store, annotations, reader, executor, config))
    }

    /// Answers `question` from the user's documents.
    ///
    /// Zero matching chunks yields an empty list, not an error. Any worker,
    /// store or model failure fails the whole request with no partial
    /// aggregation. When `query.text` is set, the transient document is
    /// removed after answering on success and failure alike.
    pub async fn answers_from_documents(
        &self,
        user_id: &str,
        question: &str,
        query: DocumentQuery,
    ) -> Result<Vec<Response>, ResponderError> {
        debug!(
            "answers_from_documents user={user_id} docs={} inline_text={}",
            query.document_ids.len(),
            query.text.is_some()
        );
        let mut document_ids = query.document_ids.clone();
        let transient_id = match &query.text {
            Some(text) => {
                let id = format!("inline-{}", sha_hex(text));
                self.store
                    .create_document(
                        user_id,
                        NewDocument {
                            title: &id,
                            origin: "inline",
                            text,
                            document_id: Some(&id),
                            replace: true,
                        },
                        None,
                    )
                    .await?;
                document_ids.push(id.clone());
                Some(id)
            }
            None => None,
        };

        let result = self
            .document_pipeline(user_id, question, &query, &document_ids)
            .await;

        // Best-effort cleanup; the request outcome is preserved either way.
        if let Some(id) = transient_id {
            if let Err(err) = self.store.delete_document(user_id, &id).await {
                warn!("transient document {id} was not removed: {err}");
            }
        }
        result
    }

    async fn document_pipeline(
        &self,
        user_id: &str,
        question: &str,
        query: &DocumentQuery,
        document_ids: &[String],
    ) -> Result<Vec<Response>, ResponderError> {
        let floor = self.config.document_thresholds.floor_lenient(&query.threshold);
        let limit = self
            .config
            .chunk_limit_per_doc(query.number_of_items, query.speed_or_accuracy);
        let restriction = (!document_ids.is_empty()).then_some(document_ids);

        let chunks = self
            .store
            .search_chunks(user_id, question, restriction, limit)
            .await?;
        if chunks.is_empty() {
            debug!("answers_from_documents: no matching chunks");
            return Ok(Vec::new());
        }

        let batches = split_batches(chunks, self.config.executor.workers_per_request);
        let outputs = self.executor.run_batches(question, &batches).await?;
        let flat = combine(outputs, &batches)?;
        trace!(
            "answers_from_documents: flat_bytes={} chunks={}",
            flat.text.len(),
            flat.positions.len()
        );

        let reader_config = ReaderConfig {
            threshold_reader: self
                .config
                .document_thresholds
                .floor_lenient(threshold::DEFAULT_LEVEL),
            top_k: query.offset + query.number_of_items,
        };
        let candidates = self
            .reader
            .answers_from_logits(reader_config, &flat.logits, &flat.overlaps, &flat.text)
            .await?;

        let translated = translate(&candidates, &flat.positions)?;
        assemble(candidates, translated, floor)
    }

    /// Answers `question` from stored annotations and saved replies.
    ///
    /// The threshold level is resolved strictly before anything is queried;
    /// an unknown name aborts the request.
    pub async fn answers_from_similar_questions(
        &self,
        user_id: &str,
        question: &str,
        query: SimilarQuery,
    ) -> Result<Vec<Response>, ResponderError> {
        let floor = self
            .config
            .saved_reply_thresholds
            .floor_strict(&query.threshold)?;
        debug!("answers_from_similar_questions user={user_id} floor={floor}");

        let filter = match query.kind {
            SimilarKind::All => SavedReplyFilter::Any,
            SimilarKind::SavedReply => SavedReplyFilter::Only,
            SimilarKind::Annotation => SavedReplyFilter::Exclude,
        };
        let restriction = (!query.document_ids.is_empty()).then_some(query.document_ids.as_slice());
        let hits = self
            .annotations
            .similar_annotations(user_id, question, restriction, filter)
            .await?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.confidence >= floor)
            .map(|hit| Response {
                answer_text: hit.answer_text,
                answer_context: hit.answer_context,
                confidence: hit.confidence,
                source_id: hit.id,
                source_type: if hit.saved_reply {
                    SourceType::SavedReply
                } else {
                    SourceType::Annotation
                },
                answer_text_start_offset: None,
                answer_text_end_offset: None,
                answer_context_start_offset: None,
                answer_context_end_offset: None,
                page: hit.page,
                metadata: hit.metadata,
            })
            .collect())
    }

    /// JSON-encoded reader embedding for `text`, for callers that index
    /// documents with reader-conditioned chunk embeddings.
    pub async fn document_embeddings(&self, text: &str) -> Result<String, ResponderError> {
        let embedding = self.reader.document_embedding(text).await?;
        Ok(serde_json::to_string(&embedding)?)
    }

    /// The stored-embedding value meaning "no embedding, score unconditioned".
    pub fn empty_embeddings() -> String {
        String::new()
    }
}

/// Lowercase hex SHA-256 of a string; transient inline-document ids hang
/// off the content hash so repeated questions reuse one id.
fn sha_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    format!("{:x}", h.finalize())
}
