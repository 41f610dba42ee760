//! Node identity on the Chord ring.
//!
//! Nodes are referred to by value everywhere: a `NodeRef` is copied into
//! finger tables, successor lists and RPC messages, and two refs are the same
//! node exactly when their identifiers match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the identifier space `[0, 2^m)`.
///
/// Newtype over `u64`; the space width is carried by [`IdSpace`](crate::ring::IdSpace),
/// not by the identifier itself.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Identifier(pub u64);

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier(value)
    }
}

/// A peer on the ring: its identifier plus the endpoint it serves RPC on.
///
/// Keep this small and cheap to clone; it is the unit every table stores.
/// "No known node" is expressed as `Option<NodeRef>::None` rather than a
/// sentinel value.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: Identifier,
    pub ip: String,
    pub port: u16,
}

impl NodeRef {
    pub fn new(id: impl Into<Identifier>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            port,
        }
    }

    /// `ip:port` form used to dial the peer.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    #[inline]
    pub fn is(&self, other: &NodeRef) -> bool {
        self.id == other.id
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::hash::Hash for NodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}@{}:{}", self.id, self.ip, self.port)
    }
}

/// Formats an optional node the way the summary dump prints it.
pub fn display_opt(node: &Option<NodeRef>) -> String {
    match node {
        Some(n) => n.to_string(),
        None => "nil".to_string(),
    }
}
