use super::ChordNode;
use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::peer::PeerLink;
use crate::ring::{Interval, SuccessorList};
use crate::state::Phase;
use tracing::{info, warn};

impl<L: PeerLink> ChordNode<L> {
    /// Joins the ring through `known`, or founds a new one.
    ///
    /// A bootstrap peer that does not answer (or answers with the wrong
    /// identity) is treated as absent. Failures part way through are logged
    /// and left for stabilization to repair; nothing is rolled back.
    pub async fn join(&self, known: Option<NodeRef>) {
        {
            let mut state = self.state.lock();
            state.phase = Phase::Joining;
            state.reset_fingers();
        }

        let bootstrap = match known {
            Some(peer) if !peer.is(&self.me) => match self.confirm_exist(&peer).await {
                Ok(()) => Some(peer),
                Err(e) => {
                    warn!("{} cannot use {} to join ({}), founding a new ring", self.me, peer, e);
                    None
                }
            },
            _ => None,
        };

        match bootstrap {
            Some(peer) => {
                info!("{} joining through {}", self.me, peer);
                match self.init_finger_table(&peer).await {
                    Ok(()) => self.update_others().await,
                    Err(e) => warn!("{} init_finger_table through {} failed: {}", self.me, peer, e),
                }
            }
            None => {
                info!("{} founding a new ring", self.me);
                self.state.lock().predecessor = Some(self.me.clone());
            }
        }

        self.migrate_keys().await;

        let mut state = self.state.lock();
        let successor = state.successor();
        state.successors = SuccessorList::seeded(successor, self.config.successor_list_len());
        state.phase = Phase::Stable;
        info!(
            "{} joined: successor {}, predecessor {}",
            self.me,
            state.successor(),
            crate::node::display_opt(&state.predecessor)
        );
    }

    /// Probes a bootstrap peer and checks it is who it claims to be.
    pub async fn confirm_exist(&self, known: &NodeRef) -> Result<()> {
        let summary = self.remote(known).summary().await?;
        if !summary.node.is(known) {
            return Err(Error::UnexpectedResponse(format!(
                "{} answered as {}",
                known, summary.node
            )));
        }
        if summary.node.is(&self.me) {
            return Err(Error::InvariantViolation(format!(
                "identifier {} is already taken",
                self.me.id
            )));
        }
        Ok(())
    }

    /// Seeds the finger table and predecessor by asking `known`.
    ///
    /// Only a missing or conflicting successor is fatal. A later step that
    /// fails is logged; an unresolved finger copies the one below it until
    /// `fix_fingers` replaces it.
    pub async fn init_finger_table(&self, known: &NodeRef) -> Result<()> {
        let bootstrap = self.remote(known);

        let start = self.finger(0)?.start;
        let successor = bootstrap.find_successor(start).await?;
        if successor.is(&self.me) {
            return Err(Error::InvariantViolation(format!(
                "identifier {} is already taken by {}",
                self.me.id, successor
            )));
        }
        self.state.lock().set_successor(successor.clone());

        let next = self.remote(&successor);
        match next.get_predecessor().await {
            Ok(predecessor) => self.state.lock().predecessor = predecessor,
            Err(e) => warn!("{} could not read predecessor of {}: {}", self.me, successor, e),
        }
        if let Err(e) = next.set_predecessor(self.me.clone()).await {
            warn!("{} could not become predecessor of {}: {}", self.me, successor, e);
        }

        for i in 0..self.space.bits() as usize - 1 {
            let current = self.finger(i)?.successor;
            let start = self.finger(i + 1)?.start;

            let node = if Interval::closed_open(self.me.id, current.id).contains(start) {
                current
            } else {
                match bootstrap.find_successor(start).await {
                    Ok(node) => node,
                    Err(e) => {
                        warn!("{} could not resolve finger[{}] through {}: {}", self.me, i + 1, known, e);
                        current
                    }
                }
            };
            self.state.lock().fingers.set(i + 1, node);
        }
        Ok(())
    }

    /// Tells every node whose finger `i` should now be this node. A node
    /// that cannot be found or updated is skipped.
    pub async fn update_others(&self) {
        for i in 0..self.space.bits() {
            let target = self.space.preceding_by_pow(self.me.id, i);
            let p = match self.find_predecessor(target).await {
                Ok(p) => p,
                Err(e) => {
                    warn!("{} could not find predecessor of {}: {}", self.me, target, e);
                    continue;
                }
            };
            if p.is(&self.me) {
                continue;
            }
            if let Err(e) = self.remote(&p).update_finger_table(self.me.clone(), i as usize).await {
                warn!("{} could not update finger[{}] of {}: {}", self.me, i, p, e);
            }
        }
    }

    /// Installs `node` as finger `index` if it is closer than the current
    /// entry, then passes the update on to the predecessor.
    pub async fn update_finger_table(&self, node: NodeRef, index: usize) -> Result<()> {
        if node.is(&self.me) {
            return Ok(());
        }

        let forward_to = {
            let mut state = self.state.lock();
            let current = match state.fingers.get(index) {
                Some(entry) => entry.successor.clone(),
                None => {
                    return Err(Error::InvariantViolation(format!(
                        "finger index {} out of range",
                        index
                    )))
                }
            };
            if !Interval::closed_open(self.me.id, current.id).contains(node.id) {
                return Ok(());
            }

            if index == 0 {
                state.set_successor(node.clone());
            } else {
                state.fingers.set(index, node.clone());
            }
            info!("{} finger[{}] -> {}", self.me, index, node);

            state
                .predecessor
                .clone()
                .filter(|p| !p.is(&self.me) && !p.is(&node))
        };

        if let Some(predecessor) = forward_to {
            if let Err(e) = self.remote(&predecessor).update_finger_table(node, index).await {
                warn!("{} could not forward finger update to {}: {}", self.me, predecessor, e);
            }
        }
        Ok(())
    }

    /// Takes over the keys in `(predecessor, self]` from the successor.
    async fn migrate_keys(&self) {
        let (predecessor, successor) = {
            let state = self.state.lock();
            (state.predecessor.clone(), state.successor())
        };
        let predecessor = match predecessor {
            Some(p) if !successor.is(&self.me) => p,
            _ => return,
        };

        match self.remote(&successor).transfer_keys(predecessor.id, self.me.id).await {
            Ok(entries) => {
                if !entries.is_empty() {
                    info!("{} took over {} keys from {}", self.me, entries.len(), successor);
                }
                self.store.absorb(entries);
            }
            Err(e) => warn!("{} key migration from {} failed: {}", self.me, successor, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChordConfig;
    use crate::node::Identifier;
    use crate::protocol::{Request, Response};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Answers as a settled ring of `members` would, except for the
    /// `(peer, method)` pairs listed in `refused`.
    struct Settled {
        members: Vec<u64>,
        refused: Vec<(u64, &'static str)>,
        updates: Mutex<Vec<(u64, usize)>>,
    }

    impl Settled {
        fn new(members: &[u64]) -> Self {
            Self {
                members: members.to_vec(),
                refused: Vec::new(),
                updates: Mutex::new(Vec::new()),
            }
        }

        fn refusing(mut self, peer: u64, method: &'static str) -> Self {
            self.refused.push((peer, method));
            self
        }

        fn owner(&self, id: Identifier) -> u64 {
            self.members.iter().copied().find(|m| *m >= id.0).unwrap_or(self.members[0])
        }

        fn after(&self, id: u64) -> u64 {
            self.members.iter().copied().find(|m| *m > id).unwrap_or(self.members[0])
        }

        fn before(&self, id: u64) -> u64 {
            let last = self.members[self.members.len() - 1];
            self.members.iter().rev().copied().find(|m| *m < id).unwrap_or(last)
        }
    }

    #[async_trait]
    impl PeerLink for Settled {
        async fn call(&self, peer: &NodeRef, request: Request) -> Result<Response> {
            let id = peer.id.0;
            if self.refused.contains(&(id, request.method())) {
                return Err(Error::unreachable(peer, "refused"));
            }
            match request {
                Request::FindSuccessor { id: target, .. } => Ok(Response::Node(node(self.owner(target)))),
                Request::GetSuccessor => Ok(Response::Node(node(self.after(id)))),
                Request::GetPredecessor => Ok(Response::Predecessor(Some(node(self.before(id))))),
                Request::SetPredecessor(_) => Ok(Response::Ack),
                Request::UpdateFingerTable { index, .. } => {
                    self.updates.lock().push((id, index));
                    Ok(Response::Ack)
                }
                _ => Err(Error::unreachable(peer, "not scripted")),
            }
        }
    }

    fn node(id: u64) -> NodeRef {
        NodeRef::new(id, "127.0.0.1", 5000 + id as u16)
    }

    fn finger_ids<L: PeerLink>(chord: &ChordNode<L>) -> Vec<u64> {
        chord.snapshot().fingers.entries().iter().map(|e| e.successor.id.0).collect()
    }

    #[tokio::test]
    async fn test_init_finger_table_survives_refused_set_predecessor() {
        let link = Settled::new(&[0, 3]).refusing(0, "set_predecessor");
        let chord = ChordNode::new(node(5), ChordConfig::new(3), link).unwrap();

        chord.init_finger_table(&node(0)).await.unwrap();

        assert_eq!(chord.predecessor(), Some(node(3)));
        // starts 6, 7, 1
        assert_eq!(finger_ids(&chord), vec![0, 0, 3]);
    }

    #[tokio::test]
    async fn test_update_others_skips_refusing_node() {
        let link = Settled::new(&[0, 3]).refusing(3, "update_finger_table");
        let chord = ChordNode::new(node(5), ChordConfig::new(3), link).unwrap();
        chord.init_finger_table(&node(0)).await.unwrap();

        chord.update_others().await;

        // 3 refused its finger[0] update; 0 still hears about finger[1] and finger[2]
        assert_eq!(*chord.link().updates.lock(), vec![(0, 1), (0, 2)]);
    }
}
