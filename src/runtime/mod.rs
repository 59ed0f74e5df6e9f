//! Thread execution, checkpointing, and streaming.
//!
//! The [`Executor`] drives compiled workflows in supersteps, persisting one
//! [`Checkpoint`] per committed step into a pluggable [`CheckpointStore`].
//! See [`executor`] for the execution model, [`checkpoint`] for persistence,
//! and [`stream`] for lazy per-step updates.

pub mod checkpoint;
#[cfg(feature = "sqlite")]
pub mod checkpoint_sqlite;
pub mod config;
pub mod executor;
pub mod persistence;
pub mod stream;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, MemorySaver};
#[cfg(feature = "sqlite")]
pub use checkpoint_sqlite::SqliteSaver;
pub use config::{CheckpointerType, ExecutorConfig};
pub use executor::{
    Executor, ExecutorError, PausedReason, RunReport, StepOptions, StepResult, ThreadInit,
};
pub use stream::{StepStream, StepUpdate};
