//! Threadflow: a conditional-routing workflow engine with durable threads.
//!
//! Workflows are directed graphs of async [`Node`](node::Node)s executed in
//! supersteps. Each superstep runs the whole frontier concurrently against
//! one immutable state snapshot, merges the outputs deterministically at a
//! barrier, routes the next frontier (static edges, or a conditional edge
//! choosing among declared targets), and appends a checkpoint. Threads are
//! therefore resumable, replayable, and pausable at gates; a pull-based
//! stream exposes one update per committed step.
//!
//! # Quick start
//!
//! ```rust
//! use threadflow::graph::GraphBuilder;
//! use threadflow::message::Message;
//! use threadflow::node::{Node, NodeContext, NodeError, NodePartial};
//! use threadflow::runtime::Executor;
//! use threadflow::state::{StateSnapshot, WorkflowState};
//! use threadflow::types::NodeId;
//! use async_trait::async_trait;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Node for Greet {
//!     async fn run(&self, _s: StateSnapshot, _c: NodeContext) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::new().with_messages(vec![Message::assistant("Hello!")]))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("greet", Greet)
//!     .add_edge(NodeId::Start, "greet")
//!     .add_edge("greet", NodeId::End)
//!     .compile()?;
//!
//! let executor = Executor::in_memory(workflow);
//! let report = executor.run("thread-1", WorkflowState::with_user_message("hi")).await?;
//! assert_eq!(report.snapshot.last_message().unwrap().content, "Hello!");
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - [`graph`]: fluent graph building and compile-time validation
//! - [`node`], [`registry`]: the work units and their name table
//! - [`state`], [`channels`], [`reducers`]: versioned state and barrier merges
//! - [`router`]: frontier routing, including conditional edges
//! - [`runtime`]: the executor, checkpoint stores, and step streaming
//! - [`memory`]: cross-thread semantic memory
//! - [`tools`], [`llm`]: explicit tool dispatch and model collaborator seams

pub mod channels;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod node;
pub mod reducers;
pub mod registry;
pub mod router;
pub mod runtime;
pub mod state;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod utils;
