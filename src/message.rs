//! Conversation messages exchanged between nodes and LLM collaborators.
//!
//! [`Message`] is the unit of the `messages` channel. Besides role and text
//! content it can carry structured [`ToolCall`] requests, which is how a
//! chat-model node hands work to the tool dispatch layer without any
//! reflection: the dispatcher looks each call's `name` up in an explicit
//! table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in a conversation.
///
/// # Examples
///
/// ```
/// use threadflow::message::Message;
///
/// let user = Message::user("What is 2 x 3?");
/// let reply = Message::assistant("Let me check.");
/// assert!(user.has_role(Message::USER));
/// assert!(reply.tool_calls.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender: `"user"`, `"assistant"`, `"system"`, `"tool"`.
    pub role: String,
    /// Text content of the message.
    pub content: String,
    /// Structured tool invocations requested by an assistant message.
    /// Empty for every other role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// A tool invocation request embedded in an assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name used to look the tool up in the dispatch table.
    pub name: String,
    /// JSON arguments forwarded verbatim to the tool.
    pub args: Value,
}

impl Message {
    /// User input message role.
    pub const USER: &'static str = "user";
    /// Assistant response message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System prompt message role.
    pub const SYSTEM: &'static str = "system";
    /// Tool result message role.
    pub const TOOL: &'static str = "tool";

    /// Creates a message with an arbitrary role.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Creates a tool-result message for the named tool.
    #[must_use]
    pub fn tool(tool_name: &str, content: &str) -> Self {
        Self::new(Self::TOOL, content).with_tool_calls(vec![ToolCall {
            name: tool_name.to_string(),
            args: Value::Null,
        }])
    }

    /// Attaches tool calls, replacing any existing ones.
    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Returns `true` if this message has the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Returns `true` if this message requests at least one tool invocation.
    #[must_use]
    pub fn requests_tools(&self) -> bool {
        self.role == Self::ASSISTANT && !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convenience_constructors_set_roles() {
        assert_eq!(Message::user("hi").role, Message::USER);
        assert_eq!(Message::assistant("hi").role, Message::ASSISTANT);
        assert_eq!(Message::system("hi").role, Message::SYSTEM);
        assert_eq!(Message::tool("calc", "6").role, Message::TOOL);
    }

    #[test]
    fn requests_tools_only_for_assistant_with_calls() {
        let plain = Message::assistant("done");
        assert!(!plain.requests_tools());

        let with_calls = Message::assistant("").with_tool_calls(vec![ToolCall {
            name: "multiply".into(),
            args: json!({"a": 2, "b": 3}),
        }]);
        assert!(with_calls.requests_tools());

        // Tool-result messages never request further tools.
        let result = Message::tool("multiply", "6");
        assert!(!result.requests_tools());
    }

    #[test]
    fn serialization_roundtrip_preserves_tool_calls() {
        let original = Message::assistant("calling").with_tool_calls(vec![ToolCall {
            name: "search".into(),
            args: json!({"query": "rust"}),
        }]);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn tool_calls_field_is_optional_in_json() {
        let parsed: Message =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert!(parsed.tool_calls.is_empty());
    }
}
