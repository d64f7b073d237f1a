//! Collaborator boundaries for document and annotation storage.
//!
//! Async is required because production backends sit behind network
//! services; the in-memory reference implementations live in
//! [`crate::memory`].

use crate::errors::StoreError;
use crate::types::{AnnotationHit, NewDocument, SavedReplyFilter, SearchResult};
use std::{future::Future, pin::Pin};

/// Per-chunk embedding supplier used during document creation.
///
/// Returns the string stored alongside each chunk; implementations that do
/// not produce embeddings return an empty string.
pub trait ChunkEmbedder: Send + Sync {
    fn embed_chunk<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + 'a>>;
}

/// Document storage boundary.
pub trait DocumentStore: Send + Sync {
    /// Ranked chunk search across a user's documents.
    ///
    /// `document_ids` restricts the search when present; `limit_per_doc`
    /// caps how many chunks a single document may contribute. Documents
    /// without matching chunks contribute nothing.
    fn search_chunks<'a>(
        &'a self,
        user_id: &'a str,
        question: &'a str,
        document_ids: Option<&'a [String]>,
        limit_per_doc: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, StoreError>> + Send + 'a>>;

    /// Creates a document and returns its id.
    ///
    /// Chunk embeddings are produced through `embedder` when supplied,
    /// otherwise chunks are stored without embeddings.
    fn create_document<'a>(
        &'a self,
        user_id: &'a str,
        doc: NewDocument<'a>,
        embedder: Option<&'a dyn ChunkEmbedder>,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + 'a>>;

    /// Deletes a document by id.
    fn delete_document<'a>(
        &'a self,
        user_id: &'a str,
        document_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;
}

/// Annotation / saved-reply storage boundary.
pub trait AnnotationStore: Send + Sync {
    /// Returns stored annotations ranked by similarity to `question`,
    /// most similar first.
    fn similar_annotations<'a>(
        &'a self,
        user_id: &'a str,
        question: &'a str,
        document_ids: Option<&'a [String]>,
        saved_replies: SavedReplyFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AnnotationHit>, StoreError>> + Send + 'a>>;
}
