//! Fluent construction of workflow graphs.
//!
//! ```rust
//! use threadflow::graph::GraphBuilder;
//! use threadflow::node::{Node, NodeContext, NodeError, NodePartial};
//! use threadflow::state::StateSnapshot;
//! use threadflow::types::NodeId;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Node for Echo {
//!     async fn run(&self, _s: StateSnapshot, _c: NodeContext) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::default())
//!     }
//! }
//!
//! let workflow = GraphBuilder::new()
//!     .add_node("echo", Echo)
//!     .add_edge(NodeId::Start, "echo")
//!     .add_edge("echo", NodeId::End)
//!     .compile()
//!     .unwrap();
//! assert_eq!(workflow.entries(), vec![NodeId::named("echo")]);
//! ```

use std::sync::Arc;

use crate::graph::compile::{self, CompileError, Workflow};
use crate::graph::edges::{ConditionalEdge, Edge, EdgePredicate};
use crate::node::Node;
use crate::registry::NodeRegistry;
use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Accumulates nodes and edges, validated all at once by [`compile`](Self::compile).
///
/// Registration problems (duplicate names, implementations attached to
/// `Start`/`End`) are deferred to `compile` so the builder stays fluent.
#[derive(Default)]
pub struct GraphBuilder {
    registry: NodeRegistry,
    edges: Vec<Edge>,
    conditional: Vec<ConditionalEdge>,
    deferred: Vec<CompileError>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executable node under a unique id.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeId>, node: impl Node + 'static) -> Self {
        if let Err(err) = self.registry.register(id.into(), node) {
            self.deferred.push(err.into());
        }
        self
    }

    /// Add a static edge. `Start` and `End` are valid endpoints.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Add a conditional edge with a closed set of declared targets.
    ///
    /// At runtime the predicate sees the post-merge snapshot and returns the
    /// name of the chosen target; a name outside `targets` fails the run with
    /// a routing error.
    #[must_use]
    pub fn add_conditional_edge(
        mut self,
        from: impl Into<NodeId>,
        targets: impl IntoIterator<Item = NodeId>,
        predicate: impl Fn(&StateSnapshot) -> String + Send + Sync + 'static,
    ) -> Self {
        self.conditional.push(ConditionalEdge::new(
            from,
            targets.into_iter().collect(),
            Arc::new(predicate) as EdgePredicate,
        ));
        self
    }

    /// Fan `from` out to every branch concurrently and join them at `join`.
    ///
    /// Sugar for one edge from `from` to each branch plus one edge from each
    /// branch to `join`. All branches execute within the same superstep on an
    /// identical snapshot; `join` runs the following superstep, after the
    /// barrier merged every branch's output.
    #[must_use]
    pub fn add_fanout(
        mut self,
        from: impl Into<NodeId>,
        branches: impl IntoIterator<Item = NodeId>,
        join: impl Into<NodeId>,
    ) -> Self {
        let from = from.into();
        let join = join.into();
        for branch in branches {
            self.edges.push(Edge::new(from.clone(), branch.clone()));
            self.edges.push(Edge::new(branch, join.clone()));
        }
        self
    }

    /// Validate and freeze the graph.
    pub fn compile(mut self) -> Result<Workflow, CompileError> {
        if !self.deferred.is_empty() {
            return Err(self.deferred.remove(0));
        }
        compile::compile(self.registry, self.edges, self.conditional)
    }
}
