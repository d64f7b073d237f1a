//! Public answer records and the result assembler.

use crate::errors::ResponderError;
use crate::translate::TranslatedSpan;
use machine_reader::ScoredSpan;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Where an answer came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SourceType {
    #[serde(rename = "document")]
    Document,
    #[serde(rename = "savedreply")]
    SavedReply,
    #[serde(rename = "annotation")]
    Annotation,
}

/// One answer as exposed to callers. Immutable once constructed; the four
/// document offsets are present on document-sourced answers only, page and
/// metadata on annotation-sourced ones.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub answer_text: String,
    pub answer_context: String,
    pub confidence: f32,
    pub source_id: String,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_text_start_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_text_end_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_context_start_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_context_end_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The wrapped answer set returned at the top-level boundary.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderAnswer {
    pub answers: Vec<Response>,
}

impl ResponderAnswer {
    /// Wraps a non-empty answer list; an empty list is invalid here.
    pub fn new(answers: Vec<Response>) -> Result<Self, ResponderError> {
        if answers.is_empty() {
            return Err(ResponderError::EmptyAnswerSet);
        }
        Ok(Self { answers })
    }
}

/// Builds document-sourced responses from extracted spans and their
/// translations, then drops those scoring strictly below `floor`.
///
/// Candidates arrive sorted by descending confidence and already truncated
/// to the requested window, so order is preserved as-is. The answer text is
/// cut to the translated span length and the context text is clipped by the
/// recorded trims; offsets are never re-derived from the excerpts.
pub fn assemble(
    candidates: Vec<ScoredSpan>,
    translated: Vec<TranslatedSpan>,
    floor: f32,
) -> Result<Vec<Response>, ResponderError> {
    if candidates.len() != translated.len() {
        return Err(ResponderError::Internal(format!(
            "{} candidates for {} translated spans",
            candidates.len(),
            translated.len()
        )));
    }

    let total = candidates.len();
    let responses: Vec<Response> = candidates
        .into_iter()
        .zip(translated)
        .filter(|(candidate, _)| candidate.score >= floor)
        .map(|(candidate, spans)| {
            let answer_text =
                truncate_to(&candidate.text, spans.answer_end - spans.answer_start);
            let answer_context = clip(
                &candidate.context,
                spans.context_left_trim,
                spans.context_right_trim,
            );
            Response {
                answer_text,
                answer_context,
                confidence: candidate.score,
                source_id: spans.document_id,
                source_type: SourceType::Document,
                answer_text_start_offset: Some(spans.answer_start),
                answer_text_end_offset: Some(spans.answer_end),
                answer_context_start_offset: Some(spans.context_start),
                answer_context_end_offset: Some(spans.context_end),
                page: None,
                metadata: None,
            }
        })
        .collect();

    debug!("assemble: kept {}/{total} above floor {floor}", responses.len());
    Ok(responses)
}

/// First `len` bytes of `text`, snapped down to a character boundary.
fn truncate_to(text: &str, len: usize) -> String {
    text[..floor_char_boundary(text, len)].to_string()
}

/// Drops `left` bytes from the front and `right` from the back, snapping
/// both cuts to character boundaries. Over-large trims yield an empty string.
fn clip(text: &str, left: usize, right: usize) -> String {
    if left + right >= text.len() {
        return String::new();
    }
    let end = floor_char_boundary(text, text.len() - right);
    let beg = ceil_char_boundary(text, left.min(end));
    text[beg..end].to_string()
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
