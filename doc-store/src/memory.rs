//! In-memory reference implementations of the store traits.
//!
//! These back the test suites and single-node deployments. Ranking follows
//! the same contract a production store must honor: most similar first,
//! per-document limits applied after ranking, nothing invented for
//! non-matching documents.

use crate::chunking::{ChunkPolicy, split_text};
use crate::errors::StoreError;
use crate::store::{AnnotationStore, ChunkEmbedder, DocumentStore};
use crate::types::{AnnotationHit, NewDocument, SavedReplyFilter, SearchResult};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::{future::Future, pin::Pin};
use tokio::sync::RwLock;
use tracing::{debug, trace};

struct StoredDocument {
    title: String,
    origin: String,
    chunks: Vec<SearchResult>,
}

/// Per-user document storage with term-overlap chunk ranking.
pub struct InMemoryDocumentStore {
    policy: ChunkPolicy,
    // user id -> document id -> document; BTreeMap keeps iteration stable.
    docs: RwLock<BTreeMap<String, BTreeMap<String, StoredDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_policy(ChunkPolicy::default())
    }

    pub fn with_policy(policy: ChunkPolicy) -> Self {
        Self {
            policy,
            docs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Title and origin of a stored document, `None` when absent.
    pub async fn document_info(&self, user_id: &str, document_id: &str) -> Option<(String, String)> {
        let guard = self.docs.read().await;
        guard
            .get(user_id)
            .and_then(|docs| docs.get(document_id))
            .map(|doc| (doc.title.clone(), doc.origin.clone()))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn search_chunks<'a>(
        &'a self,
        user_id: &'a str,
        question: &'a str,
        document_ids: Option<&'a [String]>,
        limit_per_doc: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            trace!(
                "memory::search_chunks user={user_id} restricted={} limit_per_doc={:?}",
                document_ids.is_some(),
                limit_per_doc
            );
            let question_terms = terms(question);
            let guard = self.docs.read().await;
            let Some(user_docs) = guard.get(user_id) else {
                return Ok(Vec::new());
            };

            let mut ranked: Vec<(f32, SearchResult)> = Vec::new();
            for (doc_id, doc) in user_docs {
                if let Some(wanted) = document_ids {
                    if !wanted.iter().any(|id| id == doc_id) {
                        continue;
                    }
                }
                let mut doc_hits: Vec<(f32, SearchResult)> = doc
                    .chunks
                    .iter()
                    .filter_map(|chunk| {
                        let score = overlap_score(&question_terms, &chunk.matched_content);
                        (score > 0.0).then(|| (score, chunk.clone()))
                    })
                    .collect();
                doc_hits.sort_by(|a, b| b.0.total_cmp(&a.0));
                if let Some(limit) = limit_per_doc {
                    doc_hits.truncate(limit);
                }
                ranked.extend(doc_hits);
            }
            ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

            debug!("memory::search_chunks hits={}", ranked.len());
            Ok(ranked.into_iter().map(|(_, chunk)| chunk).collect())
        })
    }

    fn create_document<'a>(
        &'a self,
        user_id: &'a str,
        doc: NewDocument<'a>,
        embedder: Option<&'a dyn ChunkEmbedder>,
    ) -> Pin<Box<dyn Future<Output = Result<String, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let document_id = match doc.document_id {
                Some(id) => id.to_string(),
                None => sha_hex(doc.text),
            };
            trace!("memory::create_document user={user_id} id={document_id}");

            {
                let guard = self.docs.read().await;
                let exists = guard
                    .get(user_id)
                    .is_some_and(|docs| docs.contains_key(&document_id));
                if exists && !doc.replace {
                    return Err(StoreError::DuplicateDocument(document_id));
                }
            }

            let mut chunks = Vec::new();
            for (idx, piece) in split_text(doc.text, self.policy).into_iter().enumerate() {
                let embedding = match embedder {
                    Some(e) => e.embed_chunk(&piece.text).await?,
                    None => String::new(),
                };
                trace!("memory::create_document chunk={idx} span={:?}", piece.span);
                chunks.push(SearchResult {
                    document_id: document_id.clone(),
                    matched_content: piece.text,
                    overlap_before: piece.overlap_before,
                    overlap_after: piece.overlap_after,
                    embedding,
                    span: piece.span,
                });
            }

            let mut guard = self.docs.write().await;
            guard.entry(user_id.to_string()).or_default().insert(
                document_id.clone(),
                StoredDocument {
                    title: doc.title.to_string(),
                    origin: doc.origin.to_string(),
                    chunks,
                },
            );
            Ok(document_id)
        })
    }

    fn delete_document<'a>(
        &'a self,
        user_id: &'a str,
        document_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            trace!("memory::delete_document user={user_id} id={document_id}");
            let mut guard = self.docs.write().await;
            let removed = guard
                .get_mut(user_id)
                .and_then(|docs| docs.remove(document_id));
            match removed {
                Some(_) => Ok(()),
                None => Err(StoreError::DocumentNotFound(document_id.to_string())),
            }
        })
    }
}

/// A stored annotation or saved reply.
#[derive(Clone, Debug)]
pub struct Annotation {
    pub id: String,
    pub question: String,
    pub answer: String,
    /// Annotations may be bound to one document; saved replies usually are not.
    pub document_id: Option<String>,
    pub saved_reply: bool,
    pub page: Option<u32>,
    pub metadata: Option<serde_json::Value>,
    /// Stamped on insert; newer entries win score ties.
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    /// A saved reply with just a question and an answer.
    pub fn saved_reply(id: &str, question: &str, answer: &str) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            document_id: None,
            saved_reply: true,
            page: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

/// Per-user annotation storage with question-similarity ranking.
pub struct InMemoryAnnotationStore {
    items: RwLock<BTreeMap<String, Vec<Annotation>>>,
}

impl InMemoryAnnotationStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Stores an annotation for `user_id`, stamping its creation time.
    pub async fn add(&self, user_id: &str, mut annotation: Annotation) {
        annotation.created_at = Utc::now();
        let mut guard = self.items.write().await;
        guard
            .entry(user_id.to_string())
            .or_default()
            .push(annotation);
    }
}

impl Default for InMemoryAnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationStore for InMemoryAnnotationStore {
    fn similar_annotations<'a>(
        &'a self,
        user_id: &'a str,
        question: &'a str,
        document_ids: Option<&'a [String]>,
        saved_replies: SavedReplyFilter,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AnnotationHit>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            trace!(
                "memory::similar_annotations user={user_id} filter={:?}",
                saved_replies
            );
            let question_terms = terms(question);
            let guard = self.items.read().await;
            let Some(items) = guard.get(user_id) else {
                return Ok(Vec::new());
            };

            let mut scored: Vec<(f32, DateTime<Utc>, AnnotationHit)> = Vec::new();
            for item in items {
                let wanted = match saved_replies {
                    SavedReplyFilter::Any => true,
                    SavedReplyFilter::Only => item.saved_reply,
                    SavedReplyFilter::Exclude => !item.saved_reply,
                };
                if !wanted {
                    continue;
                }
                // Document restrictions keep user-global saved replies visible.
                if let (Some(wanted_ids), Some(doc_id)) = (document_ids, &item.document_id) {
                    if !wanted_ids.iter().any(|id| id == doc_id) {
                        continue;
                    }
                }
                let score = overlap_score(&question_terms, &item.question);
                if score <= 0.0 {
                    continue;
                }
                scored.push((
                    score,
                    item.created_at,
                    AnnotationHit {
                        id: item.id.clone(),
                        confidence: score,
                        answer_text: item.answer.clone(),
                        answer_context: item.question.clone(),
                        saved_reply: item.saved_reply,
                        page: item.page,
                        metadata: item.metadata.clone(),
                    },
                ));
            }
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));

            debug!("memory::similar_annotations hits={}", scored.len());
            Ok(scored.into_iter().map(|(_, _, hit)| hit).collect())
        })
    }
}

/// Lowercased alphanumeric terms of `text`.
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
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

/// Lowercase hex SHA-256 of a string.
fn sha_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    format!("{:x}", h.finalize())
}
