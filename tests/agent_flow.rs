//! A full agent loop: chat model, conditional tool dispatch, and cross-thread
//! memory recall, wired through the graph the way an application would.

mod common;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use threadflow::graph::GraphBuilder;
use threadflow::llm::{ChatModel, Embedder, LlmError};
use threadflow::memory::{InMemoryStore, MemoryRecord, MemoryStore};
use threadflow::message::{Message, ToolCall};
use threadflow::node::{Node, NodeContext, NodeError, NodePartial};
use threadflow::runtime::Executor;
use threadflow::state::{StateSnapshot, WorkflowState};
use threadflow::tools::{Tool, ToolDispatch, ToolError, ToolNode};
use threadflow::types::NodeId;

/// Chat model replaying a fixed script of replies.
struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, _messages: &[Message]) -> Result<Message, LlmError> {
        self.replies
            .lock()
            .map_err(|_| LlmError::Provider {
                provider: "scripted",
                message: "script mutex poisoned".to_string(),
            })?
            .pop_front()
            .ok_or(LlmError::MalformedResponse {
                provider: "scripted",
                message: "script exhausted".to_string(),
            })
    }
}

/// Deterministic toy embedder: a two-dimensional bag of letter classes.
struct ToyEmbedder;

#[async_trait]
impl Embedder for ToyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
        let others = text.len() as f32 - vowels;
        Ok(vec![vowels, others])
    }
}

/// Node calling the chat model with the conversation so far.
struct AgentNode {
    model: Arc<dyn ChatModel>,
}

#[async_trait]
impl Node for AgentNode {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let reply = self.model.complete(&snapshot.messages).await?;
        Ok(NodePartial::new().with_messages(vec![reply]))
    }
}

struct Multiply;

#[async_trait]
impl Tool for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let a = args["a"]
            .as_i64()
            .ok_or_else(|| ToolError::invalid_args("multiply", "missing a"))?;
        let b = args["b"]
            .as_i64()
            .ok_or_else(|| ToolError::invalid_args("multiply", "missing b"))?;
        Ok(json!(a * b))
    }
}

/// agent -> tools when the last reply requests them, otherwise End; tools
/// loop back to the agent with their results.
fn agent_workflow(model: Arc<dyn ChatModel>) -> threadflow::graph::Workflow {
    let mut dispatch = ToolDispatch::new();
    dispatch.register(Multiply).unwrap();

    GraphBuilder::new()
        .add_node("agent", AgentNode { model })
        .add_node("tools", ToolNode::new(dispatch))
        .add_edge(NodeId::Start, "agent")
        .add_conditional_edge(
            "agent",
            vec![NodeId::named("tools"), NodeId::End],
            |snapshot| {
                if snapshot.last_message().is_some_and(Message::requests_tools) {
                    "tools".to_string()
                } else {
                    "End".to_string()
                }
            },
        )
        .add_edge("tools", "agent")
        .compile()
        .unwrap()
}

#[tokio::test]
async fn agent_runs_tools_then_answers() {
    let model = Arc::new(ScriptedModel::new(vec![
        Message::assistant("").with_tool_calls(vec![ToolCall {
            name: "multiply".to_string(),
            args: json!({"a": 6, "b": 7}),
        }]),
        Message::assistant("6 times 7 is 42."),
    ]));
    let executor = Executor::in_memory(agent_workflow(model));

    let report = executor
        .run("t1", WorkflowState::with_user_message("what is 6 x 7?"))
        .await
        .unwrap();

    let roles: Vec<&str> = report
        .snapshot
        .messages
        .iter()
        .map(|m| m.role.as_str())
        .collect();
    assert_eq!(roles, vec!["user", "assistant", "tool", "assistant"]);
    assert_eq!(report.snapshot.messages[2].content, "42");
    assert_eq!(
        report.snapshot.last_message().unwrap().content,
        "6 times 7 is 42."
    );
    // agent, tools, agent again.
    assert_eq!(report.steps_run, 3);
}

#[tokio::test]
async fn plain_reply_skips_the_tool_node() {
    let model = Arc::new(ScriptedModel::new(vec![Message::assistant("just chatting")]));
    let executor = Executor::in_memory(agent_workflow(model));

    let report = executor
        .run("t1", WorkflowState::with_user_message("hi"))
        .await
        .unwrap();
    assert_eq!(report.steps_run, 1);
    assert!(
        report
            .snapshot
            .messages
            .iter()
            .all(|m| !m.has_role(Message::TOOL))
    );
}

#[tokio::test]
async fn memories_recalled_across_threads_stay_per_user() {
    let store = Arc::new(InMemoryStore::new());
    let embedder = Arc::new(ToyEmbedder);

    // Thread one, user alice: remember a fact.
    let fact = "alice likes hiking";
    let embedding = embedder.embed(fact).await.unwrap();
    store
        .put(MemoryRecord::new("alice", "hobby", json!(fact), embedding))
        .await
        .unwrap();

    // A later thread recalls it through a node.
    struct Recall {
        store: Arc<InMemoryStore>,
        embedder: Arc<ToyEmbedder>,
        namespace: &'static str,
    }

    #[async_trait]
    impl Node for Recall {
        async fn run(
            &self,
            snapshot: StateSnapshot,
            _ctx: NodeContext,
        ) -> Result<NodePartial, NodeError> {
            let query = snapshot
                .last_message()
                .map(|m| m.content.clone())
                .ok_or(NodeError::MissingInput { what: "a user message" })?;
            let vector = self.embedder.embed(&query).await?;
            let recalled = self
                .store
                .search(self.namespace, &vector, 3)
                .await
                .map_err(|e| NodeError::Collaborator {
                    collaborator: "memory",
                    message: e.to_string(),
                })?;
            let facts: Vec<String> = recalled
                .iter()
                .filter_map(|r| r.value.as_str().map(str::to_string))
                .collect();
            Ok(NodePartial::new()
                .with_messages(vec![Message::system(&format!("known: {}", facts.join("; ")))]))
        }
    }

    let build = |namespace| {
        GraphBuilder::new()
            .add_node(
                "recall",
                Recall {
                    store: store.clone(),
                    embedder: embedder.clone(),
                    namespace,
                },
            )
            .add_edge(NodeId::Start, "recall")
            .add_edge("recall", NodeId::End)
            .compile()
            .unwrap()
    };

    let alice = Executor::in_memory(build("alice"));
    let report = alice
        .run("thread-2", WorkflowState::with_user_message("any plans?"))
        .await
        .unwrap();
    assert_eq!(
        report.snapshot.last_message().unwrap().content,
        "known: alice likes hiking"
    );

    // A different user's namespace sees nothing of alice's.
    let bob = Executor::in_memory(build("bob"));
    let report = bob
        .run("thread-3", WorkflowState::with_user_message("any plans?"))
        .await
        .unwrap();
    assert_eq!(report.snapshot.last_message().unwrap().content, "known: ");
}
