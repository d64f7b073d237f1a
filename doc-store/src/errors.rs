//! Unified error type for store implementations.

use thiserror::Error;

/// Top-level error for document and annotation store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document id already taken and `replace` was not requested.
    #[error("document already exists: {0}")]
    DuplicateDocument(String),

    /// Unknown document id.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// JSON parsing / serialization errors (embeddings, metadata).
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O errors from file-backed implementations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error from external store backends.
    #[error("backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
