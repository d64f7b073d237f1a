//! Core data models shared across the answering pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chunk of a document returned by chunk search.
///
/// `span` is the absolute `[start, end)` byte range that `matched_content`
/// occupies within the source document. Adjacent text is carried separately
/// as overlaps so a reader can widen its receptive field without disturbing
/// the span bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub matched_content: String,
    pub overlap_before: String,
    pub overlap_after: String,
    /// JSON-encoded `Vec<f32>`; an empty string means no stored embedding.
    pub embedding: String,
    pub span: (usize, usize),
}

/// Tri-state filter over the annotation store's saved-reply flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SavedReplyFilter {
    /// Saved replies and plain annotations alike.
    #[default]
    Any,
    /// Saved replies only.
    Only,
    /// Plain annotations only.
    Exclude,
}

/// A single hit from annotation similarity search, most similar first.
#[derive(Clone, Debug)]
pub struct AnnotationHit {
    pub id: String,
    pub confidence: f32,
    pub answer_text: String,
    /// Display context, typically the stored canonical question.
    pub answer_context: String,
    pub saved_reply: bool,
    pub page: Option<u32>,
    pub metadata: Option<Value>,
}

/// Parameters for document creation.
pub struct NewDocument<'a> {
    pub title: &'a str,
    pub origin: &'a str,
    pub text: &'a str,
    /// Caller-chosen id; `None` derives one from the content hash.
    pub document_id: Option<&'a str>,
    /// Overwrite an existing document with the same id.
    pub replace: bool,
}
