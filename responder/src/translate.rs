//! Span translator: flat-buffer coordinates back to document coordinates.
//!
//! Every chunk in the combined buffer is preceded by exactly one separator
//! byte, and the position index records each chunk at its separator's
//! offset. Translation therefore finds the owning chunk as the greatest
//! recorded offset not exceeding the span start, then applies a one-byte
//! correction when converting to document-local coordinates.

use crate::combine::{ChunkSource, PositionIndex};
use crate::errors::ResponderError;
use machine_reader::{ScoredSpan, Span};
use tracing::trace;

/// One answer span mapped back to its source document, with the context
/// span clamped to the document range and the clamped byte counts kept for
/// clipping the emitted context text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatedSpan {
    pub document_id: String,
    pub answer_start: usize,
    pub answer_end: usize,
    pub context_start: usize,
    pub context_end: usize,
    pub context_left_trim: usize,
    pub context_right_trim: usize,
}

/// Maps each candidate's answer and context spans to document coordinates.
///
/// A span start with no covering chunk means the combiner and translator
/// disagree about the buffer layout; that is a fatal internal error, never
/// coerced to a default span.
pub fn translate(
    candidates: &[ScoredSpan],
    positions: &PositionIndex,
) -> Result<Vec<TranslatedSpan>, ResponderError> {
    candidates
        .iter()
        .map(|candidate| translate_one(candidate.span, candidate.context_span, positions))
        .collect()
}

fn translate_one(
    answer: Span,
    context: Span,
    positions: &PositionIndex,
) -> Result<TranslatedSpan, ResponderError> {
    let (matched_offset, source) = owning_chunk(answer.0, positions)?;

    let answer_start = to_document(answer.0, matched_offset, source);
    // Extractions may run past the chunk's true end into overlap text;
    // never report past the document range.
    let answer_end = to_document(answer.1, matched_offset, source).min(source.doc_end);
    let answer_start = answer_start.min(answer_end);

    // The context is translated against the answer's chunk and clamped to
    // the document range on both sides.
    let raw_context_start = to_document_signed(context.0, matched_offset, source);
    let raw_context_end = to_document_signed(context.1, matched_offset, source);
    let context_start = raw_context_start.clamp(source.doc_start as i64, source.doc_end as i64);
    let context_end = raw_context_end.clamp(source.doc_start as i64, source.doc_end as i64);

    trace!(
        "translate: flat=({}, {}) doc={} answer=({answer_start}, {answer_end})",
        answer.0, answer.1, source.document_id
    );
    Ok(TranslatedSpan {
        document_id: source.document_id.clone(),
        answer_start,
        answer_end,
        context_start: context_start as usize,
        context_end: context_end as usize,
        context_left_trim: (context_start - raw_context_start) as usize,
        context_right_trim: (raw_context_end - context_end) as usize,
    })
}

/// The chunk whose recorded offset is the largest value not exceeding `s`.
fn owning_chunk(
    s: usize,
    positions: &PositionIndex,
) -> Result<(usize, &ChunkSource), ResponderError> {
    positions
        .range(..=s)
        .next_back()
        .map(|(offset, source)| (*offset, source))
        .ok_or_else(|| {
            ResponderError::Internal(format!("no chunk covers flat offset {s}"))
        })
}

/// Document-local coordinate for flat offset `s`, clamped at the chunk's
/// start. The `- 1` accounts for the chunk's leading separator; a span
/// starting exactly on the separator snaps to the chunk start.
fn to_document(s: usize, matched_offset: usize, source: &ChunkSource) -> usize {
    to_document_signed(s, matched_offset, source).max(source.doc_start as i64) as usize
}

fn to_document_signed(s: usize, matched_offset: usize, source: &ChunkSource) -> i64 {
    source.doc_start as i64 + (s as i64 - matched_offset as i64 - 1)
}
