//! Deterministic lexical reader.
//!
//! A dependency-free [`ReaderModel`] used by the test suites and single-node
//! deployments. Scoring is sentence-level question-term overlap: within the
//! best-matching sentences, words that do not appear in the question carry
//! the sentence's affinity at their start/end byte positions, so the
//! extracted span is the novel part of the sentence rather than an echo of
//! the question. A document embedding, when present, adds a small
//! similarity bias.

use crate::errors::ReaderError;
use crate::model::ReaderModel;
use crate::types::{OverlapBounds, ReaderConfig, ScoredSpan, SpanLogits};
use sha2::{Digest, Sha256};
use std::{future::Future, pin::Pin};
use tracing::{debug, trace};

const BASE_LOGIT: f32 = -4.0;
const QUESTION_WORD_WEIGHT: f32 = 0.25;
const EMBEDDING_BIAS: f32 = 0.05;
const MAX_ANSWER_BYTES: usize = 200;
const CONTEXT_PAD_BYTES: usize = 40;
const EMBEDDING_DIM: usize = 64;

/// Sentence/term-overlap reader producing deterministic logits.
#[derive(Clone, Copy, Debug, Default)]
pub struct LexicalReader;

impl LexicalReader {
    pub fn new() -> Self {
        Self
    }
}

impl ReaderModel for LexicalReader {
    fn logits<'a>(
        &'a self,
        text: &'a str,
        question: &'a str,
        overlap_before: &'a str,
        overlap_after: &'a str,
        document_embedding: Option<&'a [f32]>,
    ) -> Pin<Box<dyn Future<Output = Result<(SpanLogits, OverlapBounds), ReaderError>> + Send + 'a>>
    {
        Box::pin(async move {
            let extended = format!("{overlap_before}{text}{overlap_after}");
            let bounds = OverlapBounds {
                before: overlap_before.len(),
                after: overlap_after.len(),
            };
            let question_terms = terms(question);
            let mut start = vec![BASE_LOGIT; extended.len()];
            let mut end = vec![BASE_LOGIT; extended.len()];

            let bias = document_embedding
                .map(|emb| EMBEDDING_BIAS * cosine(emb, &term_vector(&extended)).max(0.0))
                .unwrap_or(0.0);

            for &(sent_beg, sent_end) in &sentence_ranges(&extended) {
                let sentence = &extended[sent_beg..sent_end];
                let affinity = overlap_score(&question_terms, sentence) + bias;
                if affinity <= 0.0 {
                    continue;
                }
                for (word_beg, word_end) in word_ranges(sentence) {
                    let term = normalize(&sentence[word_beg..word_end]);
                    if term.is_empty() {
                        continue;
                    }
                    let weight = if question_terms.contains(&term) {
                        affinity * QUESTION_WORD_WEIGHT
                    } else {
                        affinity
                    };
                    let start_idx = sent_beg + word_beg;
                    let end_idx = sent_beg + word_end - 1;
                    start[start_idx] = start[start_idx].max(weight);
                    end[end_idx] = end[end_idx].max(weight);
                }
            }
            trace!(
                "lexical::logits extended_len={} question_terms={}",
                extended.len(),
                question_terms.len()
            );
            Ok((SpanLogits { start, end }, bounds))
        })
    }

    fn answers_from_logits<'a>(
        &'a self,
        config: ReaderConfig,
        logits: &'a [SpanLogits],
        overlaps: &'a [OverlapBounds],
        flat_text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredSpan>, ReaderError>> + Send + 'a>> {
        Box::pin(async move {
            if logits.len() != overlaps.len() {
                return Err(ReaderError::InvalidInput(format!(
                    "{} logit sets vs {} overlap sets",
                    logits.len(),
                    overlaps.len()
                )));
            }

            let mut candidates: Vec<ScoredSpan> = Vec::new();
            let mut cursor = 0usize;
            for (chunk_logits, bounds) in logits.iter().zip(overlaps) {
                let ext_len = chunk_logits.start.len();
                if chunk_logits.end.len() != ext_len {
                    return Err(ReaderError::InvalidInput(
                        "start/end logit length mismatch".to_string(),
                    ));
                }
                let Some(matched_len) = ext_len.checked_sub(bounds.before + bounds.after) else {
                    return Err(ReaderError::InvalidInput(format!(
                        "overlap bounds {}+{} exceed logit length {ext_len}",
                        bounds.before, bounds.after
                    )));
                };

                // One separator byte precedes every chunk in the buffer.
                let chunk_beg = cursor + 1;
                if let Some(found) = best_span(chunk_logits, bounds.before, matched_len) {
                    let flat_beg = chunk_beg + (found.start - bounds.before);
                    let flat_end = chunk_beg + (found.end + 1 - bounds.before);
                    let context_beg = floor_char_boundary(
                        flat_text,
                        flat_beg.saturating_sub(CONTEXT_PAD_BYTES),
                    );
                    let context_end = ceil_char_boundary(
                        flat_text,
                        (flat_end + CONTEXT_PAD_BYTES).min(flat_text.len()),
                    );
                    candidates.push(ScoredSpan {
                        text: slice_lossy(flat_text, flat_beg, flat_end),
                        context: flat_text[context_beg..context_end].to_string(),
                        span: (flat_beg, flat_end),
                        context_span: (context_beg, context_end),
                        score: found.score,
                    });
                }
                cursor = chunk_beg + matched_len;
            }
            if cursor != flat_text.len() {
                return Err(ReaderError::InvalidInput(format!(
                    "combined text length {} does not match logit layout {cursor}",
                    flat_text.len()
                )));
            }

            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
            candidates.truncate(config.top_k);
            candidates.retain(|c| c.score >= config.threshold_reader);
            debug!(
                "lexical::answers_from_logits candidates={} top_k={}",
                candidates.len(),
                config.top_k
            );
            Ok(candidates)
        })
    }

    fn document_embedding<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, ReaderError>> + Send + 'a>> {
        Box::pin(async move { Ok(term_vector(text)) })
    }
}

struct Found {
    start: usize,
    end: usize,
    score: f32,
}

/// Highest-scoring `(start, end)` pair whose start lies in the matched
/// region. The end may run into the trailing overlap; ties keep the
/// earliest pair.
fn best_span(logits: &SpanLogits, before: usize, matched_len: usize) -> Option<Found> {
    let ext_len = logits.start.len();
    let mut best: Option<Found> = None;
    for s in before..before + matched_len {
        if logits.start[s] <= 0.0 {
            continue;
        }
        let window_end = (s + MAX_ANSWER_BYTES).min(ext_len);
        for e in s..window_end {
            if logits.end[e] <= 0.0 {
                continue;
            }
            let score = (logits.start[s] + logits.end[e]) / 2.0;
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(Found { start: s, end: e, score });
            }
        }
    }
    best
}

/// Lowercased alphanumeric terms of `text`.
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// The alphanumeric core of one word, lowercased.
fn normalize(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Fraction of `question_terms` present in `text`, in `[0, 1]`.
fn overlap_score(question_terms: &[String], text: &str) -> f32 {
    if question_terms.is_empty() {
        return 0.0;
    }
    let text_terms = terms(text);
    let found = question_terms
        .iter()
        .filter(|t| text_terms.contains(t))
        .count();
    found as f32 / question_terms.len() as f32
}

/// `[start, end)` byte ranges of sentences, split after `.`, `!`, `?`, `\n`.
fn sentence_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    for (i, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = i + ch.len_utf8();
            if !text[start..end].trim().is_empty() {
                ranges.push((start, end));
            }
            start = end;
        }
    }
    if start < text.len() && !text[start..].trim().is_empty() {
        ranges.push((start, text.len()));
    }
    ranges
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

/// L2-normalized hashed term-frequency vector of fixed dimension.
fn term_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for term in terms(text) {
        v[term_bucket(&term)] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Stable bucket for a term derived from its SHA-256 digest.
fn term_bucket(term: &str) -> usize {
    let mut h = Sha256::new();
    h.update(term.as_bytes());
    let digest = h.finalize();
    let mut eight = [0u8; 8];
    eight.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(eight) % EMBEDDING_DIM as u64) as usize
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Byte slice tolerant of ends that fall outside the text or mid-character.
fn slice_lossy(text: &str, beg: usize, end: usize) -> String {
    let end = floor_char_boundary(text, end.min(text.len()));
    let beg = floor_char_boundary(text, beg.min(end));
    text[beg..end].to_string()
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

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

    #[tokio::test]
    async fn logits_cover_the_extended_text() {
        let reader = LexicalReader::new();
        let (logits, bounds) = reader
            .logits("is Tuesday.", "what day is today?", "Today ", " More.", None)
            .await
            .unwrap();
        assert_eq!(bounds.before, 6);
        assert_eq!(bounds.after, 6);
        assert_eq!(logits.start.len(), "Today is Tuesday. More.".len());
        assert_eq!(logits.start.len(), logits.end.len());
    }

    #[tokio::test]
    async fn best_sentence_novel_words_are_extracted() {
        let reader = LexicalReader::new();
        let text = "Today is Tuesday.";
        let (logits, bounds) = reader
            .logits(text, "what day is today?", "", "", None)
            .await
            .unwrap();
        let flat = format!(" {text}");
        let config = ReaderConfig {
            threshold_reader: 0.0,
            top_k: 3,
        };
        let answers = reader
            .answers_from_logits(config, &[logits], &[bounds], &flat)
            .await
            .unwrap();
        assert!(!answers.is_empty());
        let top = &answers[0];
        assert!(top.text.contains("Tuesday"));
        assert!(top.score > 0.4);
        assert_eq!(&flat[top.span.0..top.span.1.min(flat.len())], top.text);
        assert!(top.context_span.0 <= top.span.0);
        assert!(top.context.contains(top.text.as_str()));
    }

    #[tokio::test]
    async fn unrelated_chunks_produce_no_candidates() {
        let reader = LexicalReader::new();
        let question = "what day is today?";
        let (l1, b1) = reader
            .logits("Today is Tuesday.", question, "", "", None)
            .await
            .unwrap();
        let (l2, b2) = reader
            .logits("Totally unrelated words here.", question, "", "", None)
            .await
            .unwrap();
        let flat = " Today is Tuesday. Totally unrelated words here.";
        let logits = vec![l1, l2];
        let overlaps = vec![b1, b2];

        let all = reader
            .answers_from_logits(
                ReaderConfig { threshold_reader: 0.0, top_k: 5 },
                &logits,
                &overlaps,
                flat,
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);

        let none = reader
            .answers_from_logits(
                ReaderConfig { threshold_reader: 0.9, top_k: 5 },
                &logits,
                &overlaps,
                flat,
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn document_embedding_biases_scores() {
        let reader = LexicalReader::new();
        let text = "The launch is planned for March.";
        let question = "when is the launch?";
        let emb = reader.document_embedding(text).await.unwrap();
        let (plain, _) = reader.logits(text, question, "", "", None).await.unwrap();
        let (biased, _) = reader
            .logits(text, question, "", "", Some(&emb))
            .await
            .unwrap();
        let max_plain = plain.start.iter().copied().fold(f32::MIN, f32::max);
        let max_biased = biased.start.iter().copied().fold(f32::MIN, f32::max);
        assert!(max_biased > max_plain);
    }

    #[tokio::test]
    async fn mismatched_shapes_are_rejected() {
        let reader = LexicalReader::new();
        let config = ReaderConfig {
            threshold_reader: 0.0,
            top_k: 1,
        };
        let logits = SpanLogits {
            start: vec![0.0; 4],
            end: vec![0.0; 4],
        };
        let bounds = OverlapBounds { before: 0, after: 0 };

        let err = reader
            .answers_from_logits(config, &[logits.clone()], &[], " abc")
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));

        let err = reader
            .answers_from_logits(config, &[logits], &[bounds], " abcdef")
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn answer_end_may_run_into_the_trailing_overlap() {
        let reader = LexicalReader::new();
        // The matching sentence starts in the matched text and finishes in
        // the trailing overlap, so the best span's end overhangs the chunk.
        let (logits, bounds) = reader
            .logits("The launch is", "when is the launch?", "", " planned.", None)
            .await
            .unwrap();
        let flat = " The launch is";
        let answers = reader
            .answers_from_logits(
                ReaderConfig { threshold_reader: 0.0, top_k: 1 },
                &[logits],
                &[bounds],
                flat,
            )
            .await
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert!(answers[0].span.1 > flat.len());
    }

    #[tokio::test]
    async fn document_embeddings_are_unit_length_and_deterministic() {
        let reader = LexicalReader::new();
        let a = reader.document_embedding("alpha beta gamma").await.unwrap();
        let b = reader.document_embedding("alpha beta gamma").await.unwrap();
        assert_eq!(a.len(), EMBEDDING_DIM);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let unrelated = reader
            .document_embedding("delta epsilon zeta")
            .await
            .unwrap();
        assert!(cosine(&a, &unrelated) < 0.99);
    }
}
