//! Word-aligned document chunking with absolute spans and overlap capture.
//!
//! Goals:
//! - Produce consecutive chunks whose byte spans are exact file-level ranges.
//! - Cut only at whitespace so spans always sit on character boundaries.
//! - Carry bounded adjacent text on both sides for reader conditioning.

use tracing::trace;

/// Chunking knobs. `target_bytes` bounds each chunk's matched text;
/// `overlap_bytes` bounds the adjacent text captured on each side.
#[derive(Clone, Copy, Debug)]
pub struct ChunkPolicy {
    pub target_bytes: usize,
    pub overlap_bytes: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            target_bytes: 1200,
            overlap_bytes: 200,
        }
    }
}

/// A chunk of document text with its absolute byte span and overlap text.
#[derive(Clone, Debug)]
pub struct TextChunk {
    pub text: String,
    /// Absolute `[start, end)` byte range of `text` in the source document.
    pub span: (usize, usize),
    pub overlap_before: String,
    pub overlap_after: String,
}

/// Splits `text` into consecutive chunks no larger than
/// `policy.target_bytes`, never cutting inside a word.
///
/// Every returned span satisfies `&text[span.0..span.1] == chunk.text`. A
/// single word longer than the target becomes its own chunk.
pub fn split_text(text: &str, policy: ChunkPolicy) -> Vec<TextChunk> {
    let words = word_ranges(text);
    if words.is_empty() {
        trace!("chunking::split_text: no words; nothing to do");
        return Vec::new();
    }
    let target = policy.target_bytes.max(1);

    // Greedy fill: extend the current window while it stays under target.
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let (mut beg, mut end) = words[0];
    for &(word_beg, word_end) in &words[1..] {
        if word_end - beg > target {
            ranges.push((beg, end));
            beg = word_beg;
        }
        end = word_end;
    }
    ranges.push((beg, end));

    let mut out = Vec::with_capacity(ranges.len());
    for &(chunk_beg, chunk_end) in &ranges {
        let before_beg = floor_char_boundary(text, chunk_beg.saturating_sub(policy.overlap_bytes));
        let after_end = ceil_char_boundary(text, chunk_end + policy.overlap_bytes);
        out.push(TextChunk {
            text: text[chunk_beg..chunk_end].to_string(),
            span: (chunk_beg, chunk_end),
            overlap_before: text[before_beg..chunk_beg].to_string(),
            overlap_after: text[chunk_end..after_end].to_string(),
        });
    }
    trace!(
        "chunking::split_text: produced {} chunks (target_bytes={})",
        out.len(),
        target
    );
    out
}

/// `[start, end)` byte ranges of whitespace-separated words.
fn word_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                ranges.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        ranges.push((s, text.len()));
    }
    ranges
}

/// Largest character boundary not exceeding `i`.
fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest character boundary not below `i`, capped at the text length.
fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(target: usize, overlap: usize) -> ChunkPolicy {
        ChunkPolicy {
            target_bytes: target,
            overlap_bytes: overlap,
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("Today is Tuesday.", policy(1200, 200));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Today is Tuesday.");
        assert_eq!(chunks[0].span, (0, 17));
        assert!(chunks[0].overlap_before.is_empty());
        assert!(chunks[0].overlap_after.is_empty());
    }

    #[test]
    fn spans_are_exact_source_ranges() {
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = split_text(text, policy(12, 6));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(&text[chunk.span.0..chunk.span.1], chunk.text);
            assert!(chunk.span.1 - chunk.span.0 <= 12 || !chunk.text.contains(' '));
        }
        // Consecutive spans cover the words in order with no reordering.
        for pair in chunks.windows(2) {
            assert!(pair[0].span.1 <= pair[1].span.0);
        }
    }

    #[test]
    fn overlaps_are_adjacent_text() {
        let text = "one two three four five six seven eight";
        let chunks = split_text(text, policy(10, 4));
        for chunk in &chunks {
            let expected_before_beg = chunk.span.0.saturating_sub(4);
            assert_eq!(
                chunk.overlap_before,
                &text[expected_before_beg..chunk.span.0]
            );
            let expected_after_end = (chunk.span.1 + 4).min(text.len());
            assert_eq!(chunk.overlap_after, &text[chunk.span.1..expected_after_end]);
        }
    }

    #[test]
    fn oversized_word_is_kept_whole() {
        let text = "tiny incomprehensibilities tiny";
        let chunks = split_text(text, policy(8, 0));
        assert!(chunks.iter().any(|c| c.text == "incomprehensibilities"));
    }

    #[test]
    fn overlap_windows_respect_char_boundaries() {
        let text = "héllo wörld ünïcode téxt wíth áccents evérywhere";
        let chunks = split_text(text, policy(15, 3));
        for chunk in &chunks {
            // Boundary snapping may widen the window by one character at most.
            assert!(chunk.overlap_before.len() <= 3 + 3);
            assert!(chunk.overlap_after.len() <= 3 + 3);
        }
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(split_text("", ChunkPolicy::default()).is_empty());
        assert!(split_text("   \n\t ", ChunkPolicy::default()).is_empty());
    }
}
