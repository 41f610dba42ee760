//! RPC surface exposed by every ring member.
//!
//! Message names are logical methods; the byte encoding belongs to the
//! transport. Every request gets exactly one response.

use crate::node::{Identifier, NodeRef};
use crate::state::Summary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Current predecessor (may be nil).
    GetPredecessor,
    /// Overwrite the predecessor unconditionally.
    SetPredecessor(NodeRef),
    /// Routing entry point: which node owns `id`.
    FindSuccessor { id: Identifier, queried: NodeRef },
    /// `finger[0].successor`
    GetSuccessor,
    /// Known successor-list entries, nearest first.
    GetSuccessorList,
    /// A single routing step towards `id`.
    ClosestPrecedingFinger { id: Identifier, queried: NodeRef },
    /// Propagate a newly joined node into finger `index`.
    UpdateFingerTable { node: NodeRef, index: usize },
    /// "I might be your predecessor."
    Notify(NodeRef),
    /// State snapshot; also used as the liveness probe for bootstrap peers.
    Summary,

    /// Local key lookup.
    Fetch { key: String },
    /// Local key insert; refused if the key exists.
    Insert { key: String, value: String },
    /// Remove and return the entries whose keys hash into `(lower, upper]`.
    TransferKeys { lower: Identifier, upper: Identifier },
}

impl Request {
    /// Short method name for logs.
    pub fn method(&self) -> &'static str {
        match self {
            Request::GetPredecessor => "get_predecessor",
            Request::SetPredecessor(_) => "set_predecessor",
            Request::FindSuccessor { .. } => "find_successor",
            Request::GetSuccessor => "get_successor",
            Request::GetSuccessorList => "get_successor_list",
            Request::ClosestPrecedingFinger { .. } => "closest_preceding_finger",
            Request::UpdateFingerTable { .. } => "update_finger_table",
            Request::Notify(_) => "notify",
            Request::Summary => "summary",
            Request::Fetch { .. } => "fetch",
            Request::Insert { .. } => "insert",
            Request::TransferKeys { .. } => "transfer_keys",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Ack,
    Predecessor(Option<NodeRef>),
    Node(NodeRef),
    Nodes(Vec<NodeRef>),
    Summary(Summary),
    Value(Option<String>),
    Entries(Vec<(String, String)>),
    /// The request was understood and refused.
    Rejected(String),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Ack => "ack",
            Response::Predecessor(_) => "predecessor",
            Response::Node(_) => "node",
            Response::Nodes(_) => "nodes",
            Response::Summary(_) => "summary",
            Response::Value(_) => "value",
            Response::Entries(_) => "entries",
            Response::Rejected(_) => "rejected",
        }
    }
}
