//! Structured error events carried on the `errors` channel.
//!
//! Fatal errors abort a run and travel through `Result`; these events are the
//! non-fatal record a node (or the executor itself) leaves behind so callers
//! can inspect what went wrong without the run dying. They serialize with the
//! checkpoint and survive resume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded error with its origin, timestamp, and free-form detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Where in the engine an error event originated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    /// Raised by a node's own logic. `node` is the encoded node id.
    Node { node: String, step: u64 },
    /// Raised by the executor while driving a thread.
    Executor { thread: String, step: u64 },
    /// Raised outside any particular run.
    #[default]
    Engine,
}

impl ErrorEvent {
    /// Event scoped to a node at a given step.
    pub fn node(node: impl Into<String>, step: u64, message: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Node {
                node: node.into(),
                step,
            },
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Event scoped to the executor for a given thread and step.
    pub fn executor(thread: impl Into<String>, step: u64, message: impl Into<String>) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Executor {
                thread: thread.into(),
                step,
            },
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Attach free-form JSON detail.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Sort key giving a stable order across scopes, then time, then text.
    /// The barrier uses this so replays observe identical error ordering.
    pub(crate) fn sort_key(&self) -> (u8, String, u64) {
        match &self.scope {
            ErrorScope::Node { node, step } => (0, node.clone(), *step),
            ErrorScope::Executor { thread, step } => (1, thread.clone(), *step),
            ErrorScope::Engine => (2, String::new(), 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_serializes_with_tag() {
        let event = ErrorEvent::node("Named:parse", 3, "bad input");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["scope"]["scope"], "node");
        assert_eq!(value["scope"]["node"], "Named:parse");
        assert_eq!(value["scope"]["step"], 3);
    }

    #[test]
    fn details_roundtrip() {
        let event = ErrorEvent::executor("t1", 1, "saver down")
            .with_details(json!({"backend": "sqlite"}));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ErrorEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn sort_key_orders_node_before_executor() {
        let node = ErrorEvent::node("a", 1, "x");
        let exec = ErrorEvent::executor("t", 1, "y");
        assert!(node.sort_key() < exec.sort_key());
    }
}
