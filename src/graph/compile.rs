//! Compiled workflows and graph validation.
//!
//! [`Workflow`] is the immutable product of
//! [`GraphBuilder::compile`](crate::graph::GraphBuilder::compile): a
//! validated node registry plus a routing table. Validation happens once, up
//! front; after compilation the executor can assume every edge target exists
//! and every thread has an entry frontier.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::graph::edges::{ConditionalEdge, Edge};
use crate::registry::{NodeRegistry, RegistryError};
use crate::router::Router;
use crate::types::NodeId;

/// Errors surfaced by graph compilation.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("edge {from} -> {to} references an unregistered node")]
    #[diagnostic(
        code(threadflow::graph::unknown_edge_target),
        help("Both endpoints of an edge must be registered nodes or the Start/End endpoints.")
    )]
    UnknownEdgeTarget { from: NodeId, to: NodeId },

    #[error("edge out of End (to {to}) is not allowed")]
    #[diagnostic(code(threadflow::graph::edge_from_end))]
    EdgeFromEnd { to: NodeId },

    #[error("edge into Start (from {from}) is not allowed")]
    #[diagnostic(code(threadflow::graph::edge_into_start))]
    EdgeIntoStart { from: NodeId },

    #[error("no entry edge: Start has no successors")]
    #[diagnostic(
        code(threadflow::graph::missing_entry),
        help("Add at least one edge from Start so the first superstep has a frontier.")
    )]
    MissingEntry,

    #[error("node {node} has both static and conditional outgoing edges")]
    #[diagnostic(
        code(threadflow::graph::conflicting_edges),
        help("A node routes either through one conditional edge or through static edges, not both.")
    )]
    ConflictingEdges { node: NodeId },

    #[error("node {node} has more than one conditional edge")]
    #[diagnostic(code(threadflow::graph::duplicate_conditional))]
    DuplicateConditional { node: NodeId },

    #[error("conditional edge on {from} declares no targets")]
    #[diagnostic(code(threadflow::graph::empty_targets))]
    EmptyTargets { from: NodeId },
}

/// A validated, executable workflow graph.
#[derive(Clone, Debug)]
pub struct Workflow {
    registry: NodeRegistry,
    router: Router,
}

impl Workflow {
    /// Registered node lookup; used by the executor per frontier entry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Routing table computed at compile time.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// The initial frontier of a fresh thread.
    #[must_use]
    pub fn entries(&self) -> Vec<NodeId> {
        self.router.entries()
    }
}

fn endpoint_known(registry: &NodeRegistry, id: &NodeId) -> bool {
    id.is_start() || id.is_end() || registry.contains(id)
}

/// Validate a graph definition and assemble the [`Workflow`].
pub(crate) fn compile(
    registry: NodeRegistry,
    edges: Vec<Edge>,
    conditional: Vec<ConditionalEdge>,
) -> Result<Workflow, CompileError> {
    let mut edge_map: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for edge in edges {
        if edge.from.is_end() {
            return Err(CompileError::EdgeFromEnd { to: edge.to });
        }
        if edge.to.is_start() {
            return Err(CompileError::EdgeIntoStart { from: edge.from });
        }
        if !endpoint_known(&registry, &edge.from) || !endpoint_known(&registry, &edge.to) {
            return Err(CompileError::UnknownEdgeTarget {
                from: edge.from,
                to: edge.to,
            });
        }
        edge_map.entry(edge.from).or_default().push(edge.to);
    }

    let mut conditional_map: FxHashMap<NodeId, ConditionalEdge> = FxHashMap::default();
    for edge in conditional {
        if edge.from.is_start() || edge.from.is_end() || !registry.contains(&edge.from) {
            return Err(CompileError::Registry(RegistryError::UnknownNode {
                id: edge.from.clone(),
            }));
        }
        if edge.targets.is_empty() {
            return Err(CompileError::EmptyTargets { from: edge.from });
        }
        for target in &edge.targets {
            if target.is_start() {
                return Err(CompileError::EdgeIntoStart {
                    from: edge.from.clone(),
                });
            }
            if !endpoint_known(&registry, target) {
                return Err(CompileError::UnknownEdgeTarget {
                    from: edge.from.clone(),
                    to: target.clone(),
                });
            }
        }
        if edge_map.contains_key(&edge.from) {
            return Err(CompileError::ConflictingEdges { node: edge.from });
        }
        if conditional_map.contains_key(&edge.from) {
            return Err(CompileError::DuplicateConditional { node: edge.from });
        }
        conditional_map.insert(edge.from.clone(), edge);
    }

    if edge_map
        .get(&NodeId::Start)
        .is_none_or(|targets| targets.is_empty())
    {
        return Err(CompileError::MissingEntry);
    }

    Ok(Workflow {
        registry,
        router: Router::new(edge_map, conditional_map),
    })
}
