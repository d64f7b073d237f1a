//! Chunk dispatcher: partitions search results into worker batches.

use doc_store::SearchResult;
use tracing::trace;

/// An ordered group of chunks handled by one unit of parallel work.
///
/// Order within and across batches mirrors the input and is the sole key
/// used to re-associate flattened results with their origin.
pub type WorkerBatch = Vec<SearchResult>;

/// Splits `results` into consecutive batches of `worker_count` chunks; the
/// final batch may be shorter. No chunk is dropped, duplicated or
/// reordered. `worker_count` is validated at config construction.
pub fn split_batches(results: Vec<SearchResult>, worker_count: usize) -> Vec<WorkerBatch> {
    let size = worker_count.max(1);
    let mut batches: Vec<WorkerBatch> = Vec::with_capacity(results.len().div_ceil(size));
    let mut current: WorkerBatch = Vec::with_capacity(size);
    for result in results {
        current.push(result);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    trace!(
        "dispatch::split_batches batches={} batch_size={size}",
        batches.len()
    );
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: usize) -> SearchResult {
        SearchResult {
            document_id: format!("doc-{id}"),
            matched_content: format!("chunk {id}"),
            overlap_before: String::new(),
            overlap_after: String::new(),
            embedding: String::new(),
            span: (id * 10, id * 10 + 8),
        }
    }

    fn ids(batches: &[WorkerBatch]) -> Vec<String> {
        batches
            .iter()
            .flatten()
            .map(|c| c.document_id.clone())
            .collect()
    }

    #[test]
    fn concatenated_batches_equal_the_input() {
        let input: Vec<SearchResult> = (0..7).map(chunk).collect();
        let expected: Vec<String> = input.iter().map(|c| c.document_id.clone()).collect();

        // Remainder case, worker count one, and exact multiple.
        for worker_count in [3, 1, 7] {
            let batches = split_batches(input.clone(), worker_count);
            assert_eq!(ids(&batches), expected);
            for batch in &batches[..batches.len() - 1] {
                assert_eq!(batch.len(), worker_count);
            }
            assert!(batches.last().unwrap().len() <= worker_count);
        }
    }

    #[test]
    fn batch_sizes_for_remainder_case() {
        let batches = split_batches((0..7).map(chunk).collect(), 3);
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(split_batches(Vec::new(), 4).is_empty());
    }
}
