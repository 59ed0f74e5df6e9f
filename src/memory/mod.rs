//! Cross-thread semantic memory.
//!
//! Checkpoints are per-thread; this store is what survives across threads.
//! Records live under string namespaces (one per user, agent, or tenant) and
//! carry an embedding so `search` can rank by semantic similarity. Isolation
//! is structural: each namespace is its own map, and `search` re-asserts that
//! every result belongs to the requested namespace before returning, failing
//! the call outright on a violation rather than leaking across namespaces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use thiserror::Error;
use tracing::instrument;

/// One remembered fact, scoped to a namespace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub namespace: String,
    pub key: String,
    pub value: Value,
    /// Embedding of the record's content, used for similarity search.
    pub embedding: Vec<f32>,
    pub written_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: Value,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
            embedding,
            written_at: Utc::now(),
        }
    }
}

/// Errors raised by memory stores.
#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    #[error("memory store unavailable: {message}")]
    #[diagnostic(code(threadflow::memory::unavailable))]
    Unavailable { message: String },

    #[error("embedding dimension mismatch: query has {query}, record {key:?} has {record}")]
    #[diagnostic(
        code(threadflow::memory::dimension_mismatch),
        help("All records in a namespace must share the query's embedding dimension.")
    )]
    DimensionMismatch {
        query: usize,
        record: usize,
        key: String,
    },

    #[error("namespace isolation violated: asked for {requested:?}, found record in {found:?}")]
    #[diagnostic(
        code(threadflow::memory::namespace_violation),
        help("This is an internal invariant failure; no partial results are returned.")
    )]
    NamespaceViolation { requested: String, found: String },
}

/// Long-term storage shared across workflow threads.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Insert or replace the record at `(namespace, key)`.
    async fn put(&self, record: MemoryRecord) -> Result<(), MemoryError>;

    /// Fetch one record by exact key.
    async fn get(&self, namespace: &str, key: &str)
    -> Result<Option<MemoryRecord>, MemoryError>;

    /// The `limit` records of `namespace` most similar to `query`, by cosine
    /// similarity descending; equal similarity breaks toward the most
    /// recently written record.
    async fn search(
        &self,
        namespace: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError>;

    /// All namespaces with at least one record, sorted.
    async fn list_namespaces(&self) -> Result<Vec<String>, MemoryError>;
}

type Namespaces = FxHashMap<String, FxHashMap<String, MemoryRecord>>;

/// Process-local [`MemoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    spaces: Mutex<Namespaces>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Namespaces>, MemoryError> {
        self.spaces.lock().map_err(|_| MemoryError::Unavailable {
            message: "memory store mutex poisoned".to_string(),
        })
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    #[instrument(skip(self, record), fields(namespace = %record.namespace, key = %record.key))]
    async fn put(&self, record: MemoryRecord) -> Result<(), MemoryError> {
        let mut spaces = self.lock()?;
        spaces
            .entry(record.namespace.clone())
            .or_default()
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn get(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        let spaces = self.lock()?;
        Ok(spaces.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        namespace: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let spaces = self.lock()?;
        let Some(ns) = spaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &MemoryRecord)> = Vec::with_capacity(ns.len());
        for record in ns.values() {
            if record.embedding.len() != query.len() {
                return Err(MemoryError::DimensionMismatch {
                    query: query.len(),
                    record: record.embedding.len(),
                    key: record.key.clone(),
                });
            }
            scored.push((cosine_similarity(query, &record.embedding), record));
        }
        scored.sort_by(|(sa, ra), (sb, rb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| rb.written_at.cmp(&ra.written_at))
        });

        let results: Vec<MemoryRecord> = scored
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect();
        for record in &results {
            if record.namespace != namespace {
                return Err(MemoryError::NamespaceViolation {
                    requested: namespace.to_string(),
                    found: record.namespace.clone(),
                });
            }
        }
        Ok(results)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, MemoryError> {
        let spaces = self.lock()?;
        let mut names: Vec<String> = spaces.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Cosine similarity; zero-norm vectors compare as 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
