//! SQLite-backed checkpoint store.
//!
//! One row per checkpoint, keyed by `(thread_id, step)`, with the full
//! [`PersistedCheckpoint`] as a JSON payload column. The schema is created
//! idempotently on connect so a fresh database file works without a separate
//! migration step.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

use crate::runtime::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use crate::runtime::persistence::PersistedCheckpoint;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id  TEXT    NOT NULL,
    step       INTEGER NOT NULL,
    created_at TEXT    NOT NULL,
    payload    TEXT    NOT NULL,
    PRIMARY KEY (thread_id, step)
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id, step DESC);
";

/// Durable checkpoint store on a local SQLite database.
#[derive(Clone, Debug)]
pub struct SqliteSaver {
    pool: SqlitePool,
}

impl SqliteSaver {
    /// Connect to `database_url` (e.g. `sqlite://threads.db`), creating the
    /// file and schema when absent.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(unavailable)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(unavailable)?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(unavailable)?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool; the schema must already exist.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode_row(payload: &str) -> Result<Checkpoint, CheckpointError> {
        let persisted: PersistedCheckpoint = serde_json::from_str(payload)?;
        Ok(persisted.into())
    }
}

fn unavailable(err: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Unavailable {
        message: err.to_string(),
    }
}

#[async_trait]
impl CheckpointStore for SqliteSaver {
    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, step = checkpoint.step))]
    async fn append(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let payload = serde_json::to_string(&persisted)?;
        sqlx::query(
            "INSERT INTO checkpoints (thread_id, step, created_at, payload)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (thread_id, step) DO UPDATE SET
                 created_at = excluded.created_at,
                 payload = excluded.payload",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.step as i64)
        .bind(checkpoint.created_at.to_rfc3339())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let row = sqlx::query(
            "SELECT payload FROM checkpoints
             WHERE thread_id = ?1
             ORDER BY step DESC
             LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;
        row.map(|r| Self::decode_row(r.get::<&str, _>("payload")))
            .transpose()
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let rows = sqlx::query(
            "SELECT payload FROM checkpoints
             WHERE thread_id = ?1
             ORDER BY step ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        rows.iter()
            .map(|r| Self::decode_row(r.get::<&str, _>("payload")))
            .collect()
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let rows = sqlx::query(
            "SELECT DISTINCT thread_id FROM checkpoints ORDER BY thread_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(rows
            .iter()
            .map(|r| r.get::<String, _>("thread_id"))
            .collect())
    }
}
