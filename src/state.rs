//! Workflow state and snapshots.
//!
//! State is organized into three versioned channels with per-channel merge
//! policies: `messages` (append), `data` (per-key replace), and `errors`
//! (append). Nodes never touch live state; they receive an immutable
//! [`StateSnapshot`] and return a partial update that the barrier merges.
//!
//! ```rust
//! use threadflow::state::WorkflowState;
//! use serde_json::json;
//!
//! let mut state = WorkflowState::with_user_message("Hello");
//! state.add_data("mood", json!("curious"));
//!
//! let snapshot = state.snapshot();
//! assert_eq!(snapshot.messages.len(), 1);
//! assert_eq!(snapshot.data.get("mood"), Some(&json!("curious")));
//! ```

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{
    channels::{Channel, DataChannel, ErrorsChannel, MessagesChannel, errors::ErrorEvent},
    message::Message,
};

/// The mutable state a thread of execution evolves across supersteps.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct WorkflowState {
    /// Conversation history; append-merged.
    pub messages: MessagesChannel,
    /// Keyed scratch values; replace-merged per key.
    pub data: DataChannel,
    /// Accumulated non-fatal error events; append-merged.
    pub errors: ErrorsChannel,
}

/// Immutable view of [`WorkflowState`] handed to nodes and predicates.
///
/// Cloned out of the live state before every superstep; concurrent branch
/// nodes all receive the same snapshot, so no branch can observe a sibling's
/// in-flight output.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    pub messages: Vec<Message>,
    pub messages_version: u32,
    pub data: FxHashMap<String, Value>,
    pub data_version: u32,
    pub errors: Vec<ErrorEvent>,
    pub errors_version: u32,
}

impl StateSnapshot {
    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl WorkflowState {
    /// State seeded with a single user message, the usual entry point for a
    /// chat workflow.
    pub fn with_user_message(text: &str) -> Self {
        Self {
            messages: MessagesChannel::new(vec![Message::user(text)], 1),
            ..Default::default()
        }
    }

    /// State seeded with an existing conversation history.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            ..Default::default()
        }
    }

    /// Fluent builder for states with mixed initial content.
    pub fn builder() -> WorkflowStateBuilder {
        WorkflowStateBuilder::default()
    }

    /// Append a message. Version management stays with the barrier.
    pub fn add_message(&mut self, message: Message) -> &mut Self {
        self.messages.get_mut().push(message);
        self
    }

    /// Insert a data value. Version management stays with the barrier.
    pub fn add_data(&mut self, key: &str, value: Value) -> &mut Self {
        self.data.get_mut().insert(key.to_string(), value);
        self
    }

    /// Clone out an immutable snapshot of all three channels.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            data: self.data.snapshot(),
            data_version: self.data.version(),
            errors: self.errors.snapshot(),
            errors_version: self.errors.version(),
        }
    }
}

/// Fluent construction of [`WorkflowState`] for tests and resume paths.
///
/// ```rust
/// use threadflow::state::WorkflowState;
/// use serde_json::json;
///
/// let state = WorkflowState::builder()
///     .user_message("What's the weather?")
///     .system_message("You are a weather assistant")
///     .data("location", json!("Osaka"))
///     .build();
/// assert_eq!(state.snapshot().messages.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct WorkflowStateBuilder {
    messages: Vec<Message>,
    data: FxHashMap<String, Value>,
}

impl WorkflowStateBuilder {
    pub fn user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn assistant_message(mut self, content: &str) -> Self {
        self.messages.push(Message::assistant(content));
        self
    }

    pub fn system_message(mut self, content: &str) -> Self {
        self.messages.push(Message::system(content));
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> WorkflowState {
        WorkflowState {
            messages: MessagesChannel::new(self.messages, 1),
            data: DataChannel::new(self.data, 1),
            errors: ErrorsChannel::default(),
        }
    }
}
