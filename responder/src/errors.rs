//! Typed error for the responder crate.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponderError {
    /// Unknown threshold level on the saved-reply path. Raised before any
    /// store or executor work is dispatched.
    #[error("unknown saved-reply threshold level: {0}")]
    UnknownThreshold(String),

    /// Invalid configuration (zero workers, bad scheduler endpoint).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A wrapped answer set may not be empty.
    #[error("answer set is empty")]
    EmptyAnswerSet,

    /// Combiner/translator invariant violation; never coerced to a default.
    #[error("internal inconsistency: {0}")]
    Internal(String),

    /// Errors from the document/annotation stores.
    #[error("store error: {0}")]
    Store(#[from] doc_store::StoreError),

    /// Errors from the reader model.
    #[error("reader error: {0}")]
    Reader(#[from] machine_reader::ReaderError),

    /// Transport errors when dispatching work to the scheduler.
    #[error("dispatch transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from the scheduler.
    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    Scheduler {
        status: StatusCode,
        url: String,
        /// Short snippet of the response body.
        snippet: String,
    },

    /// JSON (de)serialization issues (embeddings, wire payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
