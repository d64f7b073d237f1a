//! Inference adapter: runs the reader model over one worker batch.

use crate::errors::ResponderError;
use crate::executor::{BatchOutput, InferenceWorker};
use doc_store::SearchResult;
use machine_reader::ReaderModel;
use std::sync::Arc;
use std::{future::Future, pin::Pin};
use tracing::trace;

/// [`InferenceWorker`] backed by a reader model. Decodes each chunk's
/// stored embedding (an empty string means unconditioned scoring) and runs
/// the model once per chunk, in input order. Model failures propagate
/// unchanged; there is no local retry.
pub struct ReaderWorker {
    reader: Arc<dyn ReaderModel>,
}

impl ReaderWorker {
    pub fn new(reader: Arc<dyn ReaderModel>) -> Self {
        Self { reader }
    }
}

impl InferenceWorker for ReaderWorker {
    fn infer<'a>(
        &'a self,
        question: &'a str,
        batch: &'a [SearchResult],
    ) -> Pin<Box<dyn Future<Output = Result<BatchOutput, ResponderError>> + Send + 'a>> {
        Box::pin(async move {
            trace!("inference::infer chunks={}", batch.len());
            let mut outputs = Vec::with_capacity(batch.len());
            for chunk in batch {
                let embedding: Option<Vec<f32>> = if chunk.embedding.is_empty() {
                    None
                } else {
                    Some(serde_json::from_str(&chunk.embedding)?)
                };
                let pair = self
                    .reader
                    .logits(
                        &chunk.matched_content,
                        question,
                        &chunk.overlap_before,
                        &chunk.overlap_after,
                        embedding.as_deref(),
                    )
                    .await?;
                outputs.push(pair);
            }
            Ok(outputs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use machine_reader::LexicalReader;

    fn chunk(embedding: &str) -> SearchResult {
        SearchResult {
            document_id: "d".to_string(),
            matched_content: "Today is Tuesday.".to_string(),
            overlap_before: String::new(),
            overlap_after: String::new(),
            embedding: embedding.to_string(),
            span: (0, 17),
        }
    }

    #[tokio::test]
    async fn one_output_per_chunk_in_order() {
        let worker = ReaderWorker::new(Arc::new(LexicalReader::new()));
        let batch = vec![chunk(""), chunk("")];
        let outputs = worker.infer("what day is today?", &batch).await.unwrap();
        assert_eq!(outputs.len(), 2);
        for (logits, bounds) in &outputs {
            assert_eq!(logits.start.len(), 17);
            assert_eq!(bounds.before, 0);
        }
    }

    #[tokio::test]
    async fn stored_embedding_is_decoded_and_applied() {
        let reader = Arc::new(LexicalReader::new());
        let emb = reader.document_embedding("Today is Tuesday.").await.unwrap();
        let encoded = serde_json::to_string(&emb).unwrap();

        let worker = ReaderWorker::new(reader);
        let plain = worker
            .infer("what day is today?", &[chunk("")])
            .await
            .unwrap();
        let conditioned = worker
            .infer("what day is today?", &[chunk(&encoded)])
            .await
            .unwrap();
        let max = |output: &BatchOutput| {
            output[0]
                .0
                .start
                .iter()
                .copied()
                .fold(f32::MIN, f32::max)
        };
        assert!(max(&conditioned) > max(&plain));
    }

    #[tokio::test]
    async fn malformed_embedding_is_a_json_error() {
        let worker = ReaderWorker::new(Arc::new(LexicalReader::new()));
        let err = worker
            .infer("what day is today?", &[chunk("not json")])
            .await
            .unwrap_err();
        assert!(matches!(err, ResponderError::Json(_)));
    }
}
