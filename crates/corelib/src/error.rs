//! Error types for the core library.

use crate::node::NodeRef;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing, joining or maintaining the ring.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A remote call timed out or the connection failed. The peer is
    /// treated as dead by whoever receives this.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: NodeRef, reason: String },

    /// Local ring state broke one of its structural invariants.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// No predecessor and no successor other than this node.
    #[error("node is isolated from the ring")]
    Isolated,

    /// A peer answered with a response that does not fit the request.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A peer refused the request (e.g. inserting a key that already exists).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Invalid node configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn unreachable(peer: &NodeRef, reason: impl Into<String>) -> Self {
        Error::PeerUnreachable {
            peer: peer.clone(),
            reason: reason.into(),
        }
    }

    /// The peer this error blames, if it is a connectivity failure.
    pub fn unreachable_peer(&self) -> Option<&NodeRef> {
        match self {
            Error::PeerUnreachable { peer, .. } => Some(peer),
            _ => None,
        }
    }
}
