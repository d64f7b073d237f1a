//! Document and annotation storage boundaries for the answering pipeline.
//!
//! This crate provides:
//! - The `SearchResult` chunk record every pipeline stage consumes
//! - The `DocumentStore` / `AnnotationStore` collaborator traits
//! - Word-aligned chunking with absolute byte spans and overlap capture
//! - In-memory reference stores used by the test suites and small deployments

mod chunking;
mod errors;
mod memory;
mod store;
mod types;

pub use chunking::{ChunkPolicy, TextChunk, split_text};
pub use errors::StoreError;
pub use memory::{Annotation, InMemoryAnnotationStore, InMemoryDocumentStore};
pub use store::{AnnotationStore, ChunkEmbedder, DocumentStore};
pub use types::{AnnotationHit, NewDocument, SavedReplyFilter, SearchResult};
