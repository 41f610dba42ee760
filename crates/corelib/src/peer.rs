//! Peer abstraction: "call method M on peer P, get a result or a failure".
//!
//! [`PeerLink`] is what a transport implements. [`Remote`] wraps it into a
//! typed proxy for one peer, and [`RingPeer`] is the routing view shared by
//! the remote proxy and the node's own local state, so the router never has
//! to care which side of the wire a hop lands on.

use crate::error::{Error, Result};
use crate::node::{Identifier, NodeRef};
use crate::protocol::{Request, Response};
use crate::state::Summary;
use async_trait::async_trait;
use std::sync::Arc;

/// Request/response calls between named endpoints.
///
/// Implementations apply their own per-call timeout and report every
/// timeout or connection failure as [`Error::PeerUnreachable`].
#[async_trait]
pub trait PeerLink: Send + Sync + 'static {
    async fn call(&self, peer: &NodeRef, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: PeerLink + ?Sized> PeerLink for Arc<T> {
    async fn call(&self, peer: &NodeRef, request: Request) -> Result<Response> {
        (**self).call(peer, request).await
    }
}

/// Routing view of a node, local or remote.
#[async_trait]
pub trait RingPeer: Send + Sync {
    /// The node this view answers for.
    fn node(&self) -> &NodeRef;

    async fn successor(&self) -> Result<NodeRef>;

    async fn predecessor(&self) -> Result<Option<NodeRef>>;

    async fn successor_list(&self) -> Result<Vec<NodeRef>>;

    async fn closest_preceding_finger(&self, id: Identifier) -> Result<NodeRef>;

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef>;
}

/// Typed proxy for calls to one peer.
pub struct Remote<'a, L: ?Sized> {
    link: &'a L,
    peer: &'a NodeRef,
}

impl<'a, L: PeerLink + ?Sized> Remote<'a, L> {
    pub fn new(link: &'a L, peer: &'a NodeRef) -> Self {
        Self { link, peer }
    }

    async fn call(&self, request: Request) -> Result<Response> {
        let method = request.method();
        match self.link.call(self.peer, request).await {
            Ok(Response::Rejected(reason)) => Err(Error::Rejected(reason)),
            Ok(response) => Ok(response),
            Err(e) => {
                metrics::counter!("chord.rpc.failures").increment(1);
                tracing::debug!("{} to {} failed: {}", method, self.peer, e);
                Err(e)
            }
        }
    }

    fn unexpected(&self, wanted: &str, got: &Response) -> Error {
        Error::UnexpectedResponse(format!(
            "{} answered {} where {} was expected",
            self.peer,
            got.kind(),
            wanted
        ))
    }

    pub async fn get_predecessor(&self) -> Result<Option<NodeRef>> {
        match self.call(Request::GetPredecessor).await? {
            Response::Predecessor(p) => Ok(p),
            other => Err(self.unexpected("predecessor", &other)),
        }
    }

    pub async fn set_predecessor(&self, node: NodeRef) -> Result<()> {
        self.ack(Request::SetPredecessor(node)).await
    }

    pub async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        let request = Request::FindSuccessor {
            id,
            queried: self.peer.clone(),
        };
        self.expect_node(request).await
    }

    pub async fn get_successor(&self) -> Result<NodeRef> {
        self.expect_node(Request::GetSuccessor).await
    }

    pub async fn get_successor_list(&self) -> Result<Vec<NodeRef>> {
        match self.call(Request::GetSuccessorList).await? {
            Response::Nodes(nodes) => Ok(nodes),
            other => Err(self.unexpected("nodes", &other)),
        }
    }

    pub async fn closest_preceding_finger(&self, id: Identifier) -> Result<NodeRef> {
        let request = Request::ClosestPrecedingFinger {
            id,
            queried: self.peer.clone(),
        };
        self.expect_node(request).await
    }

    pub async fn update_finger_table(&self, node: NodeRef, index: usize) -> Result<()> {
        self.ack(Request::UpdateFingerTable { node, index }).await
    }

    pub async fn notify(&self, node: NodeRef) -> Result<()> {
        self.ack(Request::Notify(node)).await
    }

    pub async fn summary(&self) -> Result<Summary> {
        match self.call(Request::Summary).await? {
            Response::Summary(summary) => Ok(summary),
            other => Err(self.unexpected("summary", &other)),
        }
    }

    pub async fn fetch(&self, key: impl Into<String>) -> Result<Option<String>> {
        match self.call(Request::Fetch { key: key.into() }).await? {
            Response::Value(value) => Ok(value),
            other => Err(self.unexpected("value", &other)),
        }
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let request = Request::Insert {
            key: key.into(),
            value: value.into(),
        };
        self.ack(request).await
    }

    pub async fn transfer_keys(&self, lower: Identifier, upper: Identifier) -> Result<Vec<(String, String)>> {
        match self.call(Request::TransferKeys { lower, upper }).await? {
            Response::Entries(entries) => Ok(entries),
            other => Err(self.unexpected("entries", &other)),
        }
    }

    async fn ack(&self, request: Request) -> Result<()> {
        match self.call(request).await? {
            Response::Ack => Ok(()),
            other => Err(self.unexpected("ack", &other)),
        }
    }

    async fn expect_node(&self, request: Request) -> Result<NodeRef> {
        match self.call(request).await? {
            Response::Node(node) => Ok(node),
            other => Err(self.unexpected("node", &other)),
        }
    }
}

#[async_trait]
impl<'a, L: PeerLink + ?Sized> RingPeer for Remote<'a, L> {
    fn node(&self) -> &NodeRef {
        self.peer
    }

    async fn successor(&self) -> Result<NodeRef> {
        self.get_successor().await
    }

    async fn predecessor(&self) -> Result<Option<NodeRef>> {
        self.get_predecessor().await
    }

    async fn successor_list(&self) -> Result<Vec<NodeRef>> {
        self.get_successor_list().await
    }

    async fn closest_preceding_finger(&self, id: Identifier) -> Result<NodeRef> {
        Remote::closest_preceding_finger(self, id).await
    }

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        Remote::find_successor(self, id).await
    }
}
