//! Frontier routing after each superstep.
//!
//! Once a superstep's updates are merged, the [`Router`] maps every completed
//! node to its successors. Nodes with a conditional edge evaluate their
//! predicate against the post-merge snapshot; everything else follows its
//! static edges. `End` absorbs; it is never routed onward.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::instrument;

use crate::graph::edges::ConditionalEdge;
use crate::state::StateSnapshot;
use crate::types::NodeId;

/// Errors raised while computing the next frontier.
#[derive(Debug, Error, Diagnostic)]
pub enum RoutingError {
    /// A predicate returned a name outside its declared target set.
    #[error("predicate on {from} returned undeclared target {returned:?}")]
    #[diagnostic(
        code(threadflow::router::undeclared_target),
        help("Conditional edges route only to targets declared at build time; add {returned:?} to the edge's target set or fix the predicate.")
    )]
    UndeclaredTarget {
        from: NodeId,
        returned: String,
        declared: Vec<NodeId>,
    },

    /// A completed node has no outgoing edge of any kind.
    #[error("no outgoing edge from {from}")]
    #[diagnostic(
        code(threadflow::router::dead_end),
        help("Every executable node needs a static edge, a conditional edge, or an edge to End.")
    )]
    DeadEnd { from: NodeId },
}

/// Immutable routing table compiled from a graph definition.
#[derive(Clone, Debug, Default)]
pub struct Router {
    edges: FxHashMap<NodeId, Vec<NodeId>>,
    conditional: FxHashMap<NodeId, ConditionalEdge>,
}

impl Router {
    pub(crate) fn new(
        edges: FxHashMap<NodeId, Vec<NodeId>>,
        conditional: FxHashMap<NodeId, ConditionalEdge>,
    ) -> Self {
        Self { edges, conditional }
    }

    /// Successors of `from` given the post-merge snapshot.
    ///
    /// A conditional edge yields exactly one target; static edges yield all
    /// of theirs in declaration order. Duplicate targets produced by several
    /// completed nodes are deduplicated by the executor, not here.
    #[instrument(skip(self, snapshot), fields(from = %from))]
    pub fn next(
        &self,
        from: &NodeId,
        snapshot: &StateSnapshot,
    ) -> Result<Vec<NodeId>, RoutingError> {
        if from.is_end() {
            return Ok(Vec::new());
        }
        if let Some(edge) = self.conditional.get(from) {
            let returned = (edge.predicate)(snapshot);
            let target =
                edge.resolve(&returned)
                    .ok_or_else(|| RoutingError::UndeclaredTarget {
                        from: from.clone(),
                        returned: returned.clone(),
                        declared: edge.targets.clone(),
                    })?;
            tracing::debug!(target = %target, "conditional route");
            return Ok(vec![target.clone()]);
        }
        match self.edges.get(from) {
            Some(targets) if !targets.is_empty() => Ok(targets.clone()),
            _ => Err(RoutingError::DeadEnd { from: from.clone() }),
        }
    }

    /// Entry frontier: the static successors of `Start`.
    pub(crate) fn entries(&self) -> Vec<NodeId> {
        self.edges.get(&NodeId::Start).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn snapshot_with_route(route: &str) -> StateSnapshot {
        StateSnapshot {
            data: [("route".to_string(), json!(route))].into_iter().collect(),
            ..Default::default()
        }
    }

    fn router_with_conditional() -> Router {
        let edge = ConditionalEdge::new(
            "decide",
            vec![NodeId::named("happy"), NodeId::named("sad")],
            Arc::new(|snap: &StateSnapshot| {
                snap.data
                    .get("route")
                    .and_then(|v| v.as_str())
                    .unwrap_or("sad")
                    .to_string()
            }),
        );
        Router::new(
            FxHashMap::default(),
            [(NodeId::named("decide"), edge)].into_iter().collect(),
        )
    }

    #[test]
    fn conditional_routes_to_declared_target() {
        let router = router_with_conditional();
        let next = router
            .next(&NodeId::named("decide"), &snapshot_with_route("happy"))
            .unwrap();
        assert_eq!(next, vec![NodeId::named("happy")]);
    }

    #[test]
    fn undeclared_target_is_an_error() {
        let router = router_with_conditional();
        let err = router
            .next(&NodeId::named("decide"), &snapshot_with_route("confused"))
            .unwrap_err();
        match err {
            RoutingError::UndeclaredTarget { from, returned, declared } => {
                assert_eq!(from, NodeId::named("decide"));
                assert_eq!(returned, "confused");
                assert_eq!(declared.len(), 2);
            }
            other => panic!("expected UndeclaredTarget, got {other:?}"),
        }
    }

    #[test]
    fn static_edges_fire_in_declaration_order() {
        let router = Router::new(
            [(
                NodeId::named("split"),
                vec![NodeId::named("b"), NodeId::named("a")],
            )]
            .into_iter()
            .collect(),
            FxHashMap::default(),
        );
        let next = router
            .next(&NodeId::named("split"), &StateSnapshot::default())
            .unwrap();
        assert_eq!(next, vec![NodeId::named("b"), NodeId::named("a")]);
    }

    #[test]
    fn end_absorbs() {
        let router = Router::default();
        assert!(
            router
                .next(&NodeId::End, &StateSnapshot::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn missing_edges_are_a_dead_end() {
        let router = Router::default();
        let err = router
            .next(&NodeId::named("orphan"), &StateSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, RoutingError::DeadEnd { .. }));
    }
}
