//! Typed error for reader model implementations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReaderError {
    /// Logit/overlap shapes do not agree with the combined buffer.
    #[error("inconsistent model input: {0}")]
    InvalidInput(String),

    /// Failure inside an external model backend.
    #[error("model backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
