//! Executor configuration.
//!
//! Small on purpose: which checkpoint backend to use and where its database
//! lives. [`ExecutorConfig::from_env`] reads the process environment (after
//! loading a `.env` file when present) so demos and deployments configure
//! the backend without code changes.

use serde::{Deserialize, Serialize};

/// Which checkpoint backend a thread's history is written to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointerType {
    /// Process-local [`MemorySaver`](crate::runtime::checkpoint::MemorySaver);
    /// history is lost on exit.
    #[default]
    InMemory,
    /// Durable [`SqliteSaver`](crate::runtime::checkpoint_sqlite::SqliteSaver);
    /// requires the `sqlite` feature.
    Sqlite,
}

/// Backend selection for an [`Executor`](crate::runtime::Executor).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub checkpointer: CheckpointerType,
    /// Database URL for the sqlite backend, e.g. `sqlite://threads.db`.
    /// Ignored for `InMemory`.
    pub sqlite_db_url: Option<String>,
}

impl ExecutorConfig {
    /// In-memory checkpointing, the default for tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Durable sqlite checkpointing at the given database URL.
    pub fn sqlite(db_url: impl Into<String>) -> Self {
        Self {
            checkpointer: CheckpointerType::Sqlite,
            sqlite_db_url: Some(db_url.into()),
        }
    }

    /// Read configuration from the environment.
    ///
    /// `THREADFLOW_CHECKPOINTER` selects the backend (`in_memory` or
    /// `sqlite`); `THREADFLOW_SQLITE_DB` supplies the database URL. A `.env`
    /// file in the working directory is loaded first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let checkpointer = match std::env::var("THREADFLOW_CHECKPOINTER").as_deref() {
            Ok("sqlite") => CheckpointerType::Sqlite,
            _ => CheckpointerType::InMemory,
        };
        Self {
            checkpointer,
            sqlite_db_url: std::env::var("THREADFLOW_SQLITE_DB").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_in_memory() {
        let config = ExecutorConfig::default();
        assert_eq!(config.checkpointer, CheckpointerType::InMemory);
        assert!(config.sqlite_db_url.is_none());
    }

    #[test]
    fn sqlite_constructor_sets_url() {
        let config = ExecutorConfig::sqlite("sqlite://threads.db");
        assert_eq!(config.checkpointer, CheckpointerType::Sqlite);
        assert_eq!(config.sqlite_db_url.as_deref(), Some("sqlite://threads.db"));
    }
}
