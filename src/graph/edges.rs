//! Edge types connecting workflow nodes.
//!
//! Two kinds exist: static [`Edge`]s that always fire, and
//! [`ConditionalEdge`]s whose predicate chooses one target out of a declared
//! set at runtime. The declared set is part of the graph definition so
//! compile-time validation can check every possible destination, and so a
//! predicate returning a name outside it is a routing error rather than a
//! silent dead end.

use std::fmt;
use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeId;

/// A static edge: after `from` completes, `to` joins the next frontier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Predicate deciding where a conditional edge routes.
///
/// Receives the post-merge snapshot of the superstep that ran `from` and
/// returns the name of the chosen target. The returned name must resolve to
/// one of the edge's declared targets.
pub type EdgePredicate = Arc<dyn Fn(&StateSnapshot) -> String + Send + Sync>;

/// A conditional edge with a declared, closed set of possible targets.
#[derive(Clone)]
pub struct ConditionalEdge {
    pub from: NodeId,
    pub targets: Vec<NodeId>,
    pub predicate: EdgePredicate,
}

impl ConditionalEdge {
    pub fn new(
        from: impl Into<NodeId>,
        targets: Vec<NodeId>,
        predicate: EdgePredicate,
    ) -> Self {
        Self {
            from: from.into(),
            targets,
            predicate,
        }
    }

    /// Returns the declared target matching a predicate's returned name.
    #[must_use]
    pub fn resolve(&self, returned: &str) -> Option<&NodeId> {
        let wanted = NodeId::from(returned);
        self.targets.iter().find(|t| **t == wanted)
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .field("predicate", &"<fn>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_matches_declared_targets_only() {
        let edge = ConditionalEdge::new(
            "route",
            vec![NodeId::named("a"), NodeId::End],
            Arc::new(|_| "a".to_string()),
        );
        assert_eq!(edge.resolve("a"), Some(&NodeId::named("a")));
        assert_eq!(edge.resolve("End"), Some(&NodeId::End));
        assert_eq!(edge.resolve("b"), None);
    }
}
