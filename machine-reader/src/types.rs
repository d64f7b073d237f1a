//! Data models crossing the reader model boundary.

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` byte range.
pub type Span = (usize, usize);

/// Raw start/end scores over one chunk's extended text.
///
/// The extended text is `overlap_before + matched + overlap_after`; index
/// `i` scores the byte at position `i` of that extended text. `end[i]`
/// scores a span whose final byte is `i`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpanLogits {
    pub start: Vec<f32>,
    pub end: Vec<f32>,
}

/// Byte counts of the overlap-only prefix and suffix of the extended text.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OverlapBounds {
    pub before: usize,
    pub after: usize,
}

/// One extracted answer candidate, in flat-buffer coordinates.
///
/// Spans may overhang the owning chunk's range when the model scored a span
/// ending inside overlap text; downstream translation clamps them back to
/// the source document.
#[derive(Clone, Debug)]
pub struct ScoredSpan {
    pub text: String,
    pub context: String,
    pub span: Span,
    pub context_span: Span,
    pub score: f32,
}

/// Extraction knobs: minimum confidence and the ranked-window size.
#[derive(Clone, Copy, Debug)]
pub struct ReaderConfig {
    pub threshold_reader: f32,
    pub top_k: usize,
}
