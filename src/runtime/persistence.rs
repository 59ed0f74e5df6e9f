//! Serde models for durable checkpoint storage.
//!
//! Live types ([`WorkflowState`], [`Checkpoint`]) stay free of storage
//! concerns; these mirror structs define the JSON schema actually written to
//! disk. Node ids persist in their stable string encoding so the schema does
//! not depend on the enum's Rust shape.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channels::errors::ErrorEvent;
use crate::channels::{Channel, DataChannel, ErrorsChannel, MessagesChannel};
use crate::message::Message;
use crate::runtime::checkpoint::Checkpoint;
use crate::state::WorkflowState;
use crate::types::NodeId;

/// JSON shape of a persisted [`WorkflowState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub messages: Vec<Message>,
    pub messages_version: u32,
    pub data: FxHashMap<String, Value>,
    pub data_version: u32,
    #[serde(default)]
    pub errors: Vec<ErrorEvent>,
    #[serde(default = "default_version")]
    pub errors_version: u32,
}

fn default_version() -> u32 {
    1
}

/// JSON shape of a persisted [`Checkpoint`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub step: u64,
    pub state: PersistedState,
    /// Encoded node ids of the frontier that runs on resume.
    pub frontier: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_gate: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&WorkflowState> for PersistedState {
    fn from(state: &WorkflowState) -> Self {
        Self {
            messages: state.messages.snapshot(),
            messages_version: state.messages.version(),
            data: state.data.snapshot(),
            data_version: state.data.version(),
            errors: state.errors.snapshot(),
            errors_version: state.errors.version(),
        }
    }
}

impl From<PersistedState> for WorkflowState {
    fn from(persisted: PersistedState) -> Self {
        Self {
            messages: MessagesChannel::new(persisted.messages, persisted.messages_version),
            data: DataChannel::new(persisted.data, persisted.data_version),
            errors: ErrorsChannel::new(persisted.errors, persisted.errors_version),
        }
    }
}

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(checkpoint: &Checkpoint) -> Self {
        Self {
            thread_id: checkpoint.thread_id.clone(),
            step: checkpoint.step,
            state: PersistedState::from(&checkpoint.state),
            frontier: checkpoint.frontier.iter().map(NodeId::encode).collect(),
            pending_gate: checkpoint.pending_gate.as_ref().map(NodeId::encode),
            created_at: checkpoint.created_at,
        }
    }
}

impl From<PersistedCheckpoint> for Checkpoint {
    fn from(persisted: PersistedCheckpoint) -> Self {
        Self {
            thread_id: persisted.thread_id,
            step: persisted.step,
            state: persisted.state.into(),
            frontier: persisted
                .frontier
                .iter()
                .map(|s| NodeId::decode(s))
                .collect(),
            pending_gate: persisted.pending_gate.as_deref().map(NodeId::decode),
            created_at: persisted.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checkpoint_roundtrips_through_json() {
        let mut state = WorkflowState::with_user_message("hello");
        state.add_data("k", json!(42));
        let checkpoint = Checkpoint {
            thread_id: "t1".to_string(),
            step: 3,
            state,
            frontier: vec![NodeId::named("summarize"), NodeId::End],
            pending_gate: Some(NodeId::named("review")),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&PersistedCheckpoint::from(&checkpoint)).unwrap();
        let parsed: PersistedCheckpoint = serde_json::from_str(&json).unwrap();
        let restored = Checkpoint::from(parsed);

        assert_eq!(restored.step, 3);
        assert_eq!(restored.frontier, checkpoint.frontier);
        assert_eq!(restored.pending_gate, Some(NodeId::named("review")));
        assert_eq!(restored.state, checkpoint.state);
    }

    #[test]
    fn missing_errors_fields_default() {
        // Errors channel was added after the first schema version.
        let json = r#"{
            "messages": [{"role": "user", "content": "hi"}],
            "messages_version": 1,
            "data": {},
            "data_version": 1
        }"#;
        let persisted: PersistedState = serde_json::from_str(json).unwrap();
        let state = WorkflowState::from(persisted);
        assert!(state.errors.is_empty());
        assert_eq!(state.errors.version(), 1);
    }
}
