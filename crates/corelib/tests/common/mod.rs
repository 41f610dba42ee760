//! In-process network for driving whole rings without sockets.

#![allow(dead_code)]

use async_trait::async_trait;
use chord_core::{ChordConfig, ChordNode, Error, Identifier, NodeRef, PeerLink, Request, Response, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub type SimNode = ChordNode<Arc<SimNetwork>>;

/// Routes every call straight into the target node's request handler.
/// Killed nodes stay registered but every call to them fails.
#[derive(Default)]
pub struct SimNetwork {
    nodes: RwLock<HashMap<Identifier, Arc<SimNode>>>,
    dead: RwLock<HashSet<Identifier>>,
}

impl SimNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn node_ref(id: u64) -> NodeRef {
        NodeRef::new(id, "10.0.0.1", 4000 + id as u16)
    }

    /// Registers an unjoined node.
    pub fn add(self: &Arc<Self>, id: u64, bits: u32) -> Arc<SimNode> {
        self.add_with(id, ChordConfig::new(bits))
    }

    pub fn add_with(self: &Arc<Self>, id: u64, config: ChordConfig) -> Arc<SimNode> {
        let node = Arc::new(ChordNode::new(Self::node_ref(id), config, self.clone()).unwrap());
        self.nodes.write().insert(Identifier(id), node.clone());
        node
    }

    /// Registers a node and joins it through `via` (or founds a ring).
    pub async fn join(self: &Arc<Self>, id: u64, bits: u32, via: Option<u64>) -> Arc<SimNode> {
        let node = self.add(id, bits);
        node.join(via.map(Self::node_ref)).await;
        node
    }

    pub fn kill(&self, id: u64) {
        self.dead.write().insert(Identifier(id));
    }

    pub fn live(&self) -> Vec<Arc<SimNode>> {
        let dead = self.dead.read();
        let mut nodes: Vec<_> = self
            .nodes
            .read()
            .values()
            .filter(|n| !dead.contains(&n.me().id))
            .cloned()
            .collect();
        nodes.sort_by_key(|n| n.me().id);
        nodes
    }

    /// Runs `rounds` full maintenance rounds on every live node: predecessor
    /// checks, stabilize, then a refresh of every finger.
    pub async fn converge(&self, rounds: usize) {
        for _ in 0..rounds {
            for node in self.live() {
                node.check_predecessor().await;
            }
            for node in self.live() {
                node.stabilize().await;
            }
            for node in self.live() {
                for i in 1..node.space().bits() as usize {
                    let _ = node.fix_finger(i).await;
                }
            }
        }
    }
}

#[async_trait]
impl PeerLink for SimNetwork {
    async fn call(&self, peer: &NodeRef, request: Request) -> Result<Response> {
        if self.dead.read().contains(&peer.id) {
            return Err(Error::unreachable(peer, "connection refused"));
        }
        let node = self.nodes.read().get(&peer.id).cloned();
        match node {
            Some(node) => Ok(node.handle_request(request).await),
            None => Err(Error::unreachable(peer, "no route to host")),
        }
    }
}

/// The id of the first member at or after `id`, going clockwise.
pub fn expected_owner(members: &[u64], id: u64) -> u64 {
    let mut sorted = members.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|&m| m >= id)
        .unwrap_or(sorted[0])
}
