//! Span-extraction model boundary for the answering pipeline.
//!
//! This crate provides:
//! - The logit/overlap/span types crossing the model boundary
//! - The `ReaderModel` collaborator trait
//! - A deterministic lexical baseline used by the test suites and demos

mod errors;
mod lexical;
mod model;
mod types;

pub use errors::ReaderError;
pub use lexical::LexicalReader;
pub use model::ReaderModel;
pub use types::{OverlapBounds, ReaderConfig, ScoredSpan, Span, SpanLogits};
