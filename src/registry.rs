//! Registry of executable nodes, keyed by [`NodeId`].
//!
//! Registration happens once at graph-build time; afterwards the registry is
//! immutable for the life of the process. Duplicate names and lookups of
//! unregistered names are configuration bugs, surfaced immediately and never
//! retried.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::node::Node;
use crate::types::NodeId;

/// Errors raised while building or consulting the registry.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("node already registered: {id}")]
    #[diagnostic(
        code(threadflow::registry::duplicate_node),
        help("Each node name must be unique within a graph.")
    )]
    DuplicateNode { id: NodeId },

    #[error("unknown node: {id}")]
    #[diagnostic(
        code(threadflow::registry::unknown_node),
        help("Register the node before referencing it in an edge or frontier.")
    )]
    UnknownNode { id: NodeId },

    #[error("virtual endpoint {id} cannot carry an implementation")]
    #[diagnostic(
        code(threadflow::registry::virtual_endpoint),
        help("Start and End are structural markers; attach edges to them instead.")
    )]
    VirtualEndpoint { id: NodeId },
}

/// Named units of work available to the router and executor.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: FxHashMap<NodeId, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under a unique id.
    ///
    /// Fails with [`RegistryError::DuplicateNode`] when the id is taken and
    /// [`RegistryError::VirtualEndpoint`] for `Start`/`End`.
    pub fn register(
        &mut self,
        id: NodeId,
        node: impl Node + 'static,
    ) -> Result<(), RegistryError> {
        self.register_arc(id, Arc::new(node))
    }

    /// `register` for nodes already behind an `Arc`.
    pub fn register_arc(&mut self, id: NodeId, node: Arc<dyn Node>) -> Result<(), RegistryError> {
        if id.is_start() || id.is_end() {
            return Err(RegistryError::VirtualEndpoint { id });
        }
        if self.nodes.contains_key(&id) {
            return Err(RegistryError::DuplicateNode { id });
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Look up a registered node.
    pub fn get(&self, id: &NodeId) -> Result<Arc<dyn Node>, RegistryError> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownNode { id: id.clone() })
    }

    /// Returns `true` if the id is registered (virtual endpoints are not).
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over registered ids in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
