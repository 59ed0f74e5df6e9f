//! Checkpoints and the pluggable checkpoint store.
//!
//! A [`Checkpoint`] captures everything needed to resume a thread: the merged
//! state after a superstep, the step counter, and the frontier that would run
//! next. Exactly one checkpoint is appended per committed superstep (plus one
//! at step zero for the seeded initial state), so the store's history for a
//! thread is a replayable log.
//!
//! [`CheckpointStore`] is the persistence seam. [`MemorySaver`] is the
//! in-process implementation; the sqlite-backed saver lives in
//! [`crate::runtime::checkpoint_sqlite`] behind the `sqlite` feature.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::state::WorkflowState;
use crate::types::NodeId;

/// A point-in-time capture of one thread's execution.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub thread_id: String,
    /// Number of committed supersteps; zero for the seeded initial state.
    pub step: u64,
    pub state: WorkflowState,
    /// Frontier that runs next when the thread resumes.
    pub frontier: Vec<NodeId>,
    /// Set when the thread is suspended at a breakpoint before this node ran.
    pub pending_gate: Option<NodeId>,
    pub created_at: DateTime<Utc>,
}

/// Errors raised by checkpoint stores.
///
/// Stores are deliberately fail-fast: the executor aborts the step (leaving
/// the previous checkpoint authoritative) rather than retrying or running on
/// without persistence.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointError {
    #[error("checkpoint store unavailable: {message}")]
    #[diagnostic(
        code(threadflow::checkpoint::unavailable),
        help("The run stops at its last persisted checkpoint; resume the thread once the store is reachable.")
    )]
    Unavailable { message: String },

    #[error("persisted checkpoint could not be decoded")]
    #[diagnostic(code(threadflow::checkpoint::serde))]
    Serde(#[from] serde_json::Error),
}

/// Durable, append-only storage of per-thread checkpoint logs.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append one checkpoint to the thread's log.
    async fn append(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;

    /// The highest-step checkpoint for a thread, if any.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Full checkpoint history for a thread, ordered by step.
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;

    /// Every thread id with at least one checkpoint, sorted.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError>;
}

/// In-process checkpoint store backed by a map of per-thread logs.
#[derive(Debug, Default)]
pub struct MemorySaver {
    threads: Mutex<FxHashMap<String, Vec<Checkpoint>>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<String, Vec<Checkpoint>>>, CheckpointError> {
        self.threads.lock().map_err(|_| CheckpointError::Unavailable {
            message: "memory saver mutex poisoned".to_string(),
        })
    }
}

#[async_trait]
impl CheckpointStore for MemorySaver {
    async fn append(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let mut threads = self.lock()?;
        threads
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let threads = self.lock()?;
        Ok(threads
            .get(thread_id)
            .and_then(|log| log.iter().max_by_key(|c| c.step))
            .cloned())
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let threads = self.lock()?;
        let mut log = threads.get(thread_id).cloned().unwrap_or_default();
        log.sort_by_key(|c| c.step);
        Ok(log)
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let threads = self.lock()?;
        let mut ids: Vec<String> = threads.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
