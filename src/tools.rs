//! Tool dispatch.
//!
//! Tools are looked up in an explicit [`ToolDispatch`] table built at setup
//! time; there is no reflection or dynamic discovery. The prebuilt
//! [`ToolNode`] connects the table to a graph: when the latest assistant
//! message carries tool calls, it invokes each named tool in declared order
//! and appends one tool-result message per call.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::channels::errors::ErrorEvent;
use crate::message::{Message, ToolCall};
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::state::StateSnapshot;

/// Errors raised by tool dispatch and invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    #[diagnostic(
        code(threadflow::tools::unknown_tool),
        help("Tools must be registered in the dispatch table before the graph runs.")
    )]
    UnknownTool { name: String },

    #[error("tool already registered: {name}")]
    #[diagnostic(code(threadflow::tools::duplicate_tool))]
    DuplicateTool { name: String },

    #[error("tool {name} failed: {message}")]
    #[diagnostic(code(threadflow::tools::invocation))]
    Invocation { name: String, message: String },

    #[error("invalid arguments for {name}: {message}")]
    #[diagnostic(code(threadflow::tools::invalid_args))]
    InvalidArgs { name: String, message: String },
}

impl ToolError {
    /// Invocation failure with the tool's name attached.
    pub fn invocation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Argument validation failure with the tool's name attached.
    pub fn invalid_args(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// A callable tool exposed to assistant messages.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the dispatch table and tool calls refer to.
    fn name(&self) -> &str;

    /// Execute with JSON arguments, returning a JSON result.
    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}

/// Explicit name-to-tool table.
#[derive(Clone, Default)]
pub struct ToolDispatch {
    tools: FxHashMap<String, Arc<dyn Tool>>,
}

impl ToolDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    /// Look a tool up by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    /// Invoke the tool a call names.
    #[instrument(skip(self, call), fields(tool = %call.name))]
    pub async fn dispatch(&self, call: &ToolCall) -> Result<Value, ToolError> {
        self.get(&call.name)?.invoke(call.args.clone()).await
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ToolDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatch")
            .field("tools", &self.names())
            .finish()
    }
}

/// Prebuilt node executing the tool calls of the latest assistant message.
///
/// An unknown tool name is fatal: the table is fixed at setup, so a miss is
/// a wiring bug, not a runtime condition. A registered tool failing is a
/// runtime condition: the failure is appended both as a tool message (so the
/// model sees it) and as an error event on the errors channel.
#[derive(Debug)]
pub struct ToolNode {
    dispatch: ToolDispatch,
}

impl ToolNode {
    pub fn new(dispatch: ToolDispatch) -> Self {
        Self { dispatch }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let Some(request) = snapshot.last_message().filter(|m| m.requests_tools()) else {
            return Ok(NodePartial::default());
        };

        let mut messages = Vec::with_capacity(request.tool_calls.len());
        let mut events = Vec::new();
        for call in &request.tool_calls {
            // Surface wiring bugs immediately.
            if let Err(err @ ToolError::UnknownTool { .. }) = self.dispatch.get(&call.name) {
                return Err(NodeError::Collaborator {
                    collaborator: "tools",
                    message: err.to_string(),
                });
            }
            match self.dispatch.dispatch(call).await {
                Ok(result) => {
                    messages.push(Message::tool(&call.name, &result.to_string()));
                }
                Err(err) => {
                    tracing::warn!(tool = %call.name, error = %err, "tool invocation failed");
                    messages.push(Message::tool(&call.name, &format!("error: {err}")));
                    events.push(
                        ErrorEvent::node(&ctx.node, ctx.step, err.to_string())
                            .with_details(serde_json::json!({"tool": call.name})),
                    );
                }
            }
        }

        let mut partial = NodePartial::new().with_messages(messages);
        if !events.is_empty() {
            partial = partial.with_errors(events);
        }
        Ok(partial)
    }
}
