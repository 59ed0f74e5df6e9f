//! Seams for external model collaborators.
//!
//! The engine never talks to a provider directly; chat-model nodes depend on
//! [`ChatModel`] and the memory layer on [`Embedder`]. Implementations wrap
//! whatever provider the application uses; tests substitute scripted fakes.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;
use crate::node::NodeError;

/// Errors from model providers.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("provider {provider} failed: {message}")]
    #[diagnostic(
        code(threadflow::llm::provider),
        help("Provider failures are fatal to the run; resume the thread after the provider recovers.")
    )]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("provider {provider} returned an unusable response: {message}")]
    #[diagnostic(code(threadflow::llm::malformed_response))]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },
}

impl From<LlmError> for NodeError {
    fn from(err: LlmError) -> Self {
        NodeError::Collaborator {
            collaborator: "llm",
            message: err.to_string(),
        }
    }
}

/// A chat completion provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the next assistant message for a conversation. The returned
    /// message may carry tool calls for the dispatch layer.
    async fn complete(&self, messages: &[Message]) -> Result<Message, LlmError>;

    /// Stream the next completion as text chunks. The default buffers
    /// [`complete`](Self::complete) into a single chunk; providers with
    /// native streaming override this.
    async fn complete_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String, LlmError>>, LlmError> {
        let message = self.complete(messages).await?;
        Ok(Box::pin(futures_util::stream::once(async move {
            Ok(message.content)
        })))
    }
}

/// A text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    struct Fixed(&'static str);

    #[async_trait]
    impl ChatModel for Fixed {
        async fn complete(&self, _messages: &[Message]) -> Result<Message, LlmError> {
            Ok(Message::assistant(self.0))
        }
    }

    #[tokio::test]
    async fn default_stream_buffers_complete() {
        let model = Fixed("hello");
        let mut stream = model.complete_stream(&[]).await.unwrap();
        let chunks: Vec<String> = stream
            .by_ref()
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn llm_errors_convert_to_node_errors() {
        let err: NodeError = LlmError::Provider {
            provider: "test",
            message: "timeout".to_string(),
        }
        .into();
        assert!(matches!(err, NodeError::Collaborator { .. }));
    }
}
