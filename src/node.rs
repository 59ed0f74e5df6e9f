//! The [`Node`] trait and its execution primitives.
//!
//! A node is a stateless async unit of work: it receives an immutable
//! [`StateSnapshot`](crate::state::StateSnapshot) plus a [`NodeContext`] and
//! returns a [`NodePartial`] describing the changes it wants merged into the
//! thread's state. Returning `Err` aborts the run; recoverable problems
//! belong in `NodePartial::errors` instead.
//!
//! ```rust
//! use threadflow::node::{Node, NodeContext, NodeError, NodePartial};
//! use threadflow::message::Message;
//! use threadflow::state::StateSnapshot;
//! use async_trait::async_trait;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Node for Greeter {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::new().with_messages(vec![Message::assistant("Hello!")]))
//!     }
//! }
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::channels::errors::ErrorEvent;
use crate::message::Message;
use crate::state::StateSnapshot;

/// An executable unit of work in a workflow graph.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute against a snapshot, producing a partial state update.
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Node")
    }
}

/// Execution metadata handed to a node alongside its snapshot.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Encoded id of the node being executed.
    pub node: String,
    /// Superstep number within the current run.
    pub step: u64,
    /// Thread identifier owning this run.
    pub thread_id: String,
}

/// Partial state update returned by a node.
///
/// Every field is optional so a node only declares the channels it touched;
/// the barrier merges all partials of a superstep per channel policy.
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    /// Messages to append to the conversation.
    pub messages: Option<Vec<Message>>,
    /// Keyed values to insert into (or replace in) the data channel.
    pub data: Option<FxHashMap<String, Value>>,
    /// Non-fatal error events to record.
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: FxHashMap<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Single-entry data update, the common case for scalar fields.
    #[must_use]
    pub fn with_data_entry(mut self, key: &str, value: Value) -> Self {
        self.data
            .get_or_insert_with(FxHashMap::default)
            .insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Returns `true` if no channel carries an update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.as_ref().is_none_or(Vec::is_empty)
            && self.data.as_ref().is_none_or(FxHashMap::is_empty)
            && self.errors.as_ref().is_none_or(Vec::is_empty)
    }
}

/// Fatal errors raised by node execution. These abort the run; the last
/// persisted checkpoint stays intact.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input is absent from the snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(threadflow::node::missing_input),
        help("Check that an upstream node produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// An external collaborator (LLM, tool, embedder) failed.
    #[error("collaborator error ({collaborator}): {message}")]
    #[diagnostic(code(threadflow::node::collaborator))]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// JSON (de)serialization inside the node failed.
    #[error(transparent)]
    #[diagnostic(code(threadflow::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(threadflow::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_partial_reports_empty() {
        assert!(NodePartial::new().is_empty());
        assert!(NodePartial::new().with_messages(vec![]).is_empty());
        assert!(
            !NodePartial::new()
                .with_messages(vec![Message::user("x")])
                .is_empty()
        );
    }

    #[test]
    fn with_data_entry_accumulates() {
        let partial = NodePartial::new()
            .with_data_entry("a", json!(1))
            .with_data_entry("b", json!(2));
        let data = partial.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("a"), Some(&json!(1)));
    }
}
