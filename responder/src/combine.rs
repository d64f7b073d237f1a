//! Chunk combiner: stitches worker outputs into one addressable buffer.
//!
//! The fan-in half of the pipeline. Runs strictly sequentially, after every
//! batch has resolved, and records where each chunk landed so spans found
//! in the combined buffer can be mapped back to document coordinates.

use crate::dispatch::WorkerBatch;
use crate::errors::ResponderError;
use crate::executor::BatchOutput;
use machine_reader::{OverlapBounds, SpanLogits};
use std::collections::BTreeMap;
use tracing::debug;

/// Provenance of one chunk: the document and the absolute byte range its
/// matched text covers there.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSource {
    pub document_id: String,
    pub doc_start: usize,
    pub doc_end: usize,
}

/// Flat-buffer start offset (strictly increasing, one entry per chunk) to
/// chunk provenance. Every buffer byte belongs to exactly one chunk's range
/// except each chunk's single leading separator.
pub type PositionIndex = BTreeMap<usize, ChunkSource>;

/// One request's combined model inputs.
#[derive(Debug)]
pub struct Flattened {
    pub logits: Vec<SpanLogits>,
    pub overlaps: Vec<OverlapBounds>,
    pub text: String,
    pub positions: PositionIndex,
}

/// Concatenates per-chunk outputs in dispatch order (batch index, then
/// chunk index within the batch).
///
/// Each chunk's position is recorded at the offset its leading separator
/// will occupy, **before** the separator and matched text are appended —
/// the translator's separator correction depends on exactly this layout.
/// Offsets are unique and strictly increasing by construction. A shape
/// mismatch between outputs and batches is a fatal internal error.
pub fn combine(
    outputs: Vec<BatchOutput>,
    batches: &[WorkerBatch],
) -> Result<Flattened, ResponderError> {
    if outputs.len() != batches.len() {
        return Err(ResponderError::Internal(format!(
            "{} batch outputs for {} batches",
            outputs.len(),
            batches.len()
        )));
    }

    let total: usize = batches.iter().map(|b| b.len()).sum();
    let mut flat = Flattened {
        logits: Vec::with_capacity(total),
        overlaps: Vec::with_capacity(total),
        text: String::new(),
        positions: BTreeMap::new(),
    };

    for (batch_idx, (output, batch)) in outputs.into_iter().zip(batches).enumerate() {
        if output.len() != batch.len() {
            return Err(ResponderError::Internal(format!(
                "batch {batch_idx}: {} outputs for {} chunks",
                output.len(),
                batch.len()
            )));
        }
        for ((logits, bounds), chunk) in output.into_iter().zip(batch) {
            flat.logits.push(logits);
            flat.overlaps.push(bounds);
            flat.positions.insert(
                flat.text.len(),
                ChunkSource {
                    document_id: chunk.document_id.clone(),
                    doc_start: chunk.span.0,
                    doc_end: chunk.span.1,
                },
            );
            flat.text.push(' ');
            flat.text.push_str(&chunk.matched_content);
        }
    }

    debug!(
        "combine: chunks={} flat_bytes={}",
        flat.positions.len(),
        flat.text.len()
    );
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::SearchResult;

    fn chunk(doc: &str, text: &str, span: (usize, usize)) -> SearchResult {
        SearchResult {
            document_id: doc.to_string(),
            matched_content: text.to_string(),
            overlap_before: String::new(),
            overlap_after: String::new(),
            embedding: String::new(),
            span,
        }
    }

    fn output_for(batch: &WorkerBatch) -> BatchOutput {
        batch
            .iter()
            .map(|c| {
                let len = c.matched_content.len();
                (
                    SpanLogits {
                        start: vec![0.0; len],
                        end: vec![0.0; len],
                    },
                    OverlapBounds { before: 0, after: 0 },
                )
            })
            .collect()
    }

    #[test]
    fn layout_is_separator_then_chunk_text() {
        let batches = vec![
            vec![chunk("a", "alpha", (0, 5)), chunk("a", "beta", (6, 10))],
            vec![chunk("b", "gamma", (100, 105))],
        ];
        let outputs: Vec<BatchOutput> = batches.iter().map(output_for).collect();
        let flat = combine(outputs, &batches).unwrap();

        assert_eq!(flat.text, " alpha beta gamma");
        assert_eq!(flat.logits.len(), 3);
        assert_eq!(flat.overlaps.len(), 3);
    }

    #[test]
    fn positions_are_strictly_increasing_one_per_chunk() {
        let batches = vec![
            vec![chunk("a", "alpha", (0, 5)), chunk("a", "beta", (6, 10))],
            vec![chunk("b", "gamma", (100, 105))],
        ];
        let outputs: Vec<BatchOutput> = batches.iter().map(output_for).collect();
        let flat = combine(outputs, &batches).unwrap();

        let keys: Vec<usize> = flat.positions.keys().copied().collect();
        assert_eq!(keys, vec![0, 6, 11]);
        assert_eq!(flat.positions.len(), 3);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        let source = &flat.positions[&11];
        assert_eq!(source.document_id, "b");
        assert_eq!((source.doc_start, source.doc_end), (100, 105));
    }

    #[test]
    fn position_is_recorded_at_the_separator_offset() {
        let batches = vec![vec![chunk("d", "hello", (40, 45))]];
        let outputs: Vec<BatchOutput> = batches.iter().map(output_for).collect();
        let flat = combine(outputs, &batches).unwrap();
        // Offset 0 is the separator; the chunk text begins at 1.
        assert!(flat.positions.contains_key(&0));
        assert_eq!(&flat.text[1..], "hello");
    }

    #[test]
    fn shape_drift_is_an_internal_error() {
        let batches = vec![vec![chunk("a", "alpha", (0, 5))]];

        let err = combine(Vec::new(), &batches).unwrap_err();
        assert!(matches!(err, ResponderError::Internal(_)));

        let err = combine(vec![Vec::new()], &batches).unwrap_err();
        assert!(matches!(err, ResponderError::Internal(_)));
    }

    #[test]
    fn empty_request_combines_to_nothing() {
        let flat = combine(Vec::new(), &[]).unwrap();
        assert!(flat.text.is_empty());
        assert!(flat.positions.is_empty());
    }
}
