//! Core identifiers for workflow graphs.
//!
//! [`NodeId`] names the vertices of a workflow graph, including the virtual
//! `Start`/`End` endpoints, and [`ChannelId`] names the state channels that
//! carry data between supersteps. Both support a stable string encoding used
//! by the persistence layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual endpoints: they are never registered or
/// executed, existing only so edges can express entry and exit points.
/// Every executable node is `Named` with a caller-chosen unique string.
///
/// # Examples
///
/// ```rust
/// use threadflow::types::NodeId;
///
/// let classify = NodeId::named("classify");
/// assert_eq!(classify.encode(), "Named:classify");
/// assert_eq!(NodeId::decode("Named:classify"), classify);
/// assert_eq!(NodeId::decode("End"), NodeId::End);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// Virtual entry point. Has no implementation and no incoming edges.
    Start,
    /// Virtual exit point. Has no implementation and no outgoing edges.
    End,
    /// An executable node registered under a unique name.
    Named(String),
}

impl NodeId {
    /// Convenience constructor for a named node.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        NodeId::Named(name.into())
    }

    /// Encode into the persisted string form.
    ///
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Named("x")` → `"Named:x"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeId::Start => "Start".to_string(),
            NodeId::End => "End".to_string(),
            NodeId::Named(name) => format!("Named:{name}"),
        }
    }

    /// Decode a persisted string form back into a `NodeId`.
    ///
    /// Unrecognized encodings fall back to `Named(s)` so old checkpoints
    /// written before an encoding change still round-trip.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeId::Start
        } else if s == "End" {
            NodeId::End
        } else if let Some(rest) = s.strip_prefix("Named:") {
            NodeId::Named(rest.to_string())
        } else {
            NodeId::Named(s.to_string())
        }
    }

    /// Returns `true` for the virtual `Start` endpoint.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual `End` endpoint.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

// Lets string literals stand in for a NodeId in builder calls.
impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeId::Start,
            "End" => NodeId::End,
            other => NodeId::Named(other.to_string()),
        }
    }
}

/// Identifies a state channel and, implicitly, its merge policy.
///
/// Each channel has a fixed reducer: `Messages` appends, `Data` replaces
/// per key, `Errors` appends.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// Conversation messages; merge policy is append.
    Messages,
    /// Keyed scratch values and intermediate results; merge policy is
    /// per-key replace.
    Data,
    /// Non-fatal error events collected during execution; merge policy is
    /// append.
    Errors,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages => write!(f, "messages"),
            Self::Data => write!(f, "data"),
            Self::Errors => write!(f, "errors"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_encode_decode_roundtrip() {
        for id in [NodeId::Start, NodeId::End, NodeId::named("worker")] {
            assert_eq!(NodeId::decode(&id.encode()), id);
        }
    }

    #[test]
    fn unknown_encoding_falls_back_to_named() {
        assert_eq!(NodeId::decode("worker"), NodeId::named("worker"));
    }

    #[test]
    fn from_str_recognizes_virtual_endpoints() {
        assert_eq!(NodeId::from("Start"), NodeId::Start);
        assert_eq!(NodeId::from("End"), NodeId::End);
        assert_eq!(NodeId::from("route"), NodeId::named("route"));
    }
}
