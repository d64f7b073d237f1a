//! Reader model boundary.

use crate::errors::ReaderError;
use crate::types::{OverlapBounds, ReaderConfig, ScoredSpan, SpanLogits};
use std::{future::Future, pin::Pin};

/// Span-extraction model interface.
///
/// `logits` runs once per chunk during fan-out; `answers_from_logits` runs
/// once per request over the combined buffer. Implementations must be
/// shareable across worker tasks.
pub trait ReaderModel: Send + Sync {
    /// Produces start/end scores for `text` extended by the given overlaps.
    ///
    /// `document_embedding` conditions scoring on the owning document when
    /// available; `None` means unconditioned scoring.
    fn logits<'a>(
        &'a self,
        text: &'a str,
        question: &'a str,
        overlap_before: &'a str,
        overlap_after: &'a str,
        document_embedding: Option<&'a [f32]>,
    ) -> Pin<Box<dyn Future<Output = Result<(SpanLogits, OverlapBounds), ReaderError>> + Send + 'a>>;

    /// Extracts ranked answer candidates from combined per-chunk logits.
    ///
    /// `flat_text` is the combined buffer the chunks were stitched into, one
    /// logits/overlap pair per chunk in buffer order. Results come back
    /// sorted by descending score, truncated to `config.top_k`, with
    /// candidates scoring below `config.threshold_reader` removed.
    fn answers_from_logits<'a>(
        &'a self,
        config: ReaderConfig,
        logits: &'a [SpanLogits],
        overlaps: &'a [OverlapBounds],
        flat_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredSpan>, ReaderError>> + Send + 'a>>;

    /// Document-level embedding used to condition chunk scoring.
    fn document_embedding<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ReaderError>> + Send + 'a>>;
}
