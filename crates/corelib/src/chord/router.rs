use super::ChordNode;
use crate::error::Result;
use crate::node::{Identifier, NodeRef};
use crate::peer::{PeerLink, Remote, RingPeer};
use crate::ring::Interval;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Routing view backed by the node's own state.
pub struct Local<'a, L> {
    node: &'a ChordNode<L>,
}

#[async_trait]
impl<'a, L: PeerLink> RingPeer for Local<'a, L> {
    fn node(&self) -> &NodeRef {
        &self.node.me
    }

    async fn successor(&self) -> Result<NodeRef> {
        Ok(self.node.successor())
    }

    async fn predecessor(&self) -> Result<Option<NodeRef>> {
        Ok(self.node.predecessor())
    }

    async fn successor_list(&self) -> Result<Vec<NodeRef>> {
        Ok(self.node.state.lock().successors.live())
    }

    async fn closest_preceding_finger(&self, id: Identifier) -> Result<NodeRef> {
        Ok(self.node.closest_preceding_finger_local(id))
    }

    async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        self.node.find_successor(id).await
    }
}

impl<L: PeerLink> ChordNode<L> {
    /// Picks the local or remote view of `target`.
    pub fn peer<'a>(&'a self, target: &'a NodeRef) -> Box<dyn RingPeer + 'a> {
        if target.is(&self.me) {
            Box::new(Local { node: self })
        } else {
            Box::new(Remote::new(&self.link, target))
        }
    }

    /// `queried`'s immediate successor, or `None` if it cannot be reached.
    pub async fn get_successor(&self, queried: &NodeRef) -> Option<NodeRef> {
        match self.peer(queried).successor().await {
            Ok(node) => Some(node),
            Err(e) => {
                warn!("{} could not get successor of {}: {}", self.me, queried, e);
                None
            }
        }
    }

    /// One routing step towards `id`, answered by `queried`.
    pub async fn closest_preceding_finger(&self, id: Identifier, queried: &NodeRef) -> Result<NodeRef> {
        self.peer(queried).closest_preceding_finger(id).await
    }

    pub(crate) fn closest_preceding_finger_local(&self, id: Identifier) -> NodeRef {
        let state = self.state.lock();
        state
            .fingers
            .closest_preceding(self.me.id, id)
            .cloned()
            .unwrap_or_else(|| self.me.clone())
    }

    /// The node `n'` with `id ∈ (n', n'.successor]`.
    ///
    /// Walks the ring from self through closest-preceding fingers. A walk
    /// that stops making progress or hits the iteration cap is a routing
    /// anomaly: it is logged and the last candidate is returned as-is.
    pub async fn find_predecessor(&self, id: Identifier) -> Result<NodeRef> {
        let cap = self.space.lookup_iteration_cap();
        let mut candidate = self.me.clone();
        let mut successor = self.successor();
        let mut hops = 0u64;

        while !Interval::open_closed(candidate.id, successor.id).contains(id) && !candidate.is(&successor) {
            if hops >= cap {
                metrics::counter!("chord.routing.anomalies").increment(1);
                warn!("{} gave up routing to {} after {} hops at {}", self.me, id, hops, candidate);
                break;
            }
            hops += 1;

            let next = self.peer(&candidate).closest_preceding_finger(id).await?;
            if next.is(&candidate) {
                metrics::counter!("chord.routing.anomalies").increment(1);
                warn!("{} routing to {} stalled at {}", self.me, id, candidate);
                break;
            }
            successor = self.peer(&next).successor().await?;
            debug!("{} routing to {}: hop {} -> {} (successor {})", self.me, id, hops, next, successor);
            candidate = next;
        }

        Ok(candidate)
    }

    /// The node owning `id`, computed from this node.
    pub async fn find_successor(&self, id: Identifier) -> Result<NodeRef> {
        let predecessor = self.find_predecessor(id).await?;
        let successor = self.peer(&predecessor).successor().await;
        successor
    }

    /// The node owning `id`, as computed by `queried`.
    pub async fn find_successor_at(&self, id: Identifier, queried: &NodeRef) -> Result<NodeRef> {
        self.peer(queried).find_successor(id).await
    }

    /// `queried`'s successor list, nearest first.
    pub async fn get_successor_table(&self, queried: &NodeRef) -> Result<Vec<NodeRef>> {
        self.peer(queried).successor_list().await
    }
}
