//! Shared fixtures for integration tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use threadflow::message::Message;
use threadflow::node::{Node, NodeContext, NodeError, NodePartial};
use threadflow::runtime::checkpoint::{
    Checkpoint, CheckpointError, CheckpointStore, MemorySaver,
};
use threadflow::state::StateSnapshot;

/// Writes `data["text"] = value`, replacing whatever was there.
#[allow(dead_code)]
pub struct SetText(pub &'static str);

#[async_trait]
impl Node for SetText {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_data_entry("text", json!(self.0)))
    }
}

/// Appends a suffix to `data["text"]`.
#[allow(dead_code)]
pub struct AppendText(pub &'static str);

#[async_trait]
impl Node for AppendText {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let current = snapshot
            .data
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(NodePartial::new().with_data_entry("text", json!(format!("{current}{}", self.0))))
    }
}

/// Appends one assistant message.
#[allow(dead_code)]
pub struct Say(pub &'static str);

#[async_trait]
impl Node for Say {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with_messages(vec![Message::assistant(self.0)]))
    }
}

/// Sleeps, then appends one assistant message. Used to force completion
/// orders that differ from frontier order.
#[allow(dead_code)]
pub struct SlowSay {
    pub text: &'static str,
    pub delay_ms: u64,
}

#[async_trait]
impl Node for SlowSay {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        Ok(NodePartial::new().with_messages(vec![Message::assistant(self.text)]))
    }
}

/// Always fails.
#[allow(dead_code)]
pub struct Failing;

#[async_trait]
impl Node for Failing {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::ValidationFailed("deliberate failure".to_string()))
    }
}

/// Store that starts failing appends after a set number of successes, backed
/// by a real [`MemorySaver`] for everything it accepts.
#[allow(dead_code)]
pub struct FlakyStore {
    inner: MemorySaver,
    appends_left: AtomicU64,
}

impl FlakyStore {
    #[allow(dead_code)]
    pub fn failing_after(successful_appends: u64) -> Self {
        Self {
            inner: MemorySaver::new(),
            appends_left: AtomicU64::new(successful_appends),
        }
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn append(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let left = self.appends_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(CheckpointError::Unavailable {
                message: "backend unreachable".to_string(),
            });
        }
        self.appends_left.store(left - 1, Ordering::SeqCst);
        self.inner.append(checkpoint).await
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        self.inner.latest(thread_id).await
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        self.inner.history(thread_id).await
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        self.inner.list_threads().await
    }
}

/// The `data["text"]` value of a snapshot, empty if unset.
#[allow(dead_code)]
pub fn text_of(snapshot: &StateSnapshot) -> String {
    snapshot
        .data
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Contents of the messages channel as plain strings.
#[allow(dead_code)]
pub fn message_texts(snapshot: &StateSnapshot) -> Vec<String> {
    snapshot.messages.iter().map(|m| m.content.clone()).collect()
}
