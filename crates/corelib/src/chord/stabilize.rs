use super::ChordNode;
use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::peer::PeerLink;
use crate::ring::{Interval, SuccessorList};
use rand::Rng;
use tracing::{debug, error, info, warn};

impl<L: PeerLink> ChordNode<L> {
    /// Verifies the immediate successor and tells it about this node.
    ///
    /// Never fails: an unreachable successor is handled by the successor
    /// list fail-over in [`update_successor_table`](Self::update_successor_table).
    pub async fn stabilize(&self) {
        let successor = self.successor();

        if successor.is(&self.me) {
            if let Err(e) = self.stabilize_self().await {
                debug!("{} stabilize_self: {}", self.me, e);
            }
        } else {
            let x = match self.remote(&successor).get_predecessor().await {
                Ok(Some(x)) => x,
                Ok(None) => self.me.clone(),
                Err(e) => {
                    warn!("{} cannot reach successor {}: {}", self.me, successor, e);
                    self.me.clone()
                }
            };
            // the successor may have moved while the probe was in flight
            let mut state = self.state.lock();
            let current = state.successor();
            if Interval::open(self.me.id, current.id).contains(x.id) {
                info!("{} adopting {} as successor", self.me, x);
                state.set_successor(x);
            }
        }

        let successor = self.successor();
        if !successor.is(&self.me) {
            if let Err(e) = self.remote(&successor).notify(self.me.clone()).await {
                warn!("{} could not notify {}: {}", self.me, successor, e);
            }
        }

        match self.update_successor_table().await {
            Ok(()) => {}
            Err(e @ Error::InvariantViolation(_)) => error!("{} successor table: {}", self.me, e),
            Err(e) => warn!("{} successor table: {}", self.me, e),
        }
    }

    /// Closes a ring whose only link points back at this node by adopting
    /// the predecessor as successor.
    pub async fn stabilize_self(&self) -> Result<()> {
        let predecessor = self.predecessor().ok_or(Error::Isolated)?;
        if predecessor.is(&self.me) {
            return if self.successor().is(&self.me) {
                Err(Error::Isolated)
            } else {
                Ok(())
            };
        }

        self.remote(&predecessor).get_predecessor().await?;
        info!("{} closing ring through predecessor {}", self.me, predecessor);
        self.state.lock().set_successor(predecessor);
        Ok(())
    }

    /// `candidate` thinks it might be our predecessor. Returns whether it
    /// was adopted.
    pub fn notify(&self, candidate: NodeRef) -> bool {
        if candidate.is(&self.me) {
            return false;
        }

        let mut state = self.state.lock();
        let adopt = match &state.predecessor {
            None => true,
            Some(current) => Interval::open(current.id, self.me.id).contains(candidate.id),
        };
        if adopt {
            info!("{} adopting {} as predecessor", self.me, candidate);
            state.predecessor = Some(candidate);
        }
        adopt
    }

    /// Refreshes one random finger in `[1, m)`.
    pub async fn fix_fingers(&self) {
        let bits = self.space.bits() as usize;
        if bits < 2 {
            return;
        }
        let index = rand::thread_rng().gen_range(1..bits);
        if let Err(e) = self.fix_finger(index).await {
            warn!("{} fix_finger({}) failed: {}", self.me, index, e);
        }
    }

    /// Recomputes finger `index`. A dead node met on the way is evicted
    /// from the whole table.
    pub async fn fix_finger(&self, index: usize) -> Result<NodeRef> {
        let start = self.finger(index)?.start;

        match self.find_successor(start).await {
            Ok(node) => {
                self.state.lock().fingers.set(index, node.clone());
                Ok(node)
            }
            Err(e) => {
                if let Some(dead) = e.unreachable_peer() {
                    let evicted = self.state.lock().evict(dead);
                    if evicted > 0 {
                        warn!("{} evicted {} from {} fingers", self.me, dead, evicted);
                    }
                }
                Err(e)
            }
        }
    }

    /// Probes the predecessor and forgets it if it does not answer.
    pub async fn check_predecessor(&self) -> bool {
        let predecessor = match self.predecessor() {
            Some(p) if p.is(&self.me) => return true,
            Some(p) => p,
            None => return false,
        };

        if self.remote(&predecessor).get_predecessor().await.is_ok() {
            return true;
        }

        let mut state = self.state.lock();
        if state.predecessor.as_ref().map_or(false, |p| p.is(&predecessor)) {
            warn!("{} predecessor {} is gone", self.me, predecessor);
            state.predecessor = None;
        }
        false
    }

    /// Probes the immediate successor without touching state.
    pub async fn check_successor(&self) -> bool {
        let successor = self.successor();
        successor.is(&self.me) || self.remote(&successor).get_successor().await.is_ok()
    }

    /// Fails over to the next live successor, then rebuilds the successor
    /// list from the successor's own list.
    pub async fn update_successor_table(&self) -> Result<()> {
        let capacity = self.config.successor_list_len();
        let len = self.state.lock().successors.len();
        if len != capacity {
            return Err(Error::InvariantViolation(format!(
                "successor list has {} entries, expected {}",
                len, capacity
            )));
        }

        let mut successor_ok = self.check_successor().await;
        while !successor_ok {
            let (failed, next) = {
                let mut state = self.state.lock();
                let failed = state.successor();
                let next = match state.successors.shift() {
                    Some(next) => next,
                    None => {
                        state.successors = SuccessorList::seeded(self.me.clone(), capacity);
                        self.me.clone()
                    }
                };
                state.fingers.set(0, next.clone());
                state.evict(&failed);
                (failed, next)
            };
            metrics::counter!("chord.successor.failovers").increment(1);
            warn!("{} successor {} unreachable, failing over to {}", self.me, failed, next);

            successor_ok = self.check_successor().await;
        }

        let successor = self.successor();
        if successor.is(&self.me) {
            self.state.lock().successors.pad(capacity);
            return Ok(());
        }

        match self.get_successor_table(&successor).await {
            Ok(theirs) => {
                self.state
                    .lock()
                    .successors
                    .reconcile(&self.me, &successor, &theirs, capacity);
                Ok(())
            }
            Err(e) => {
                self.state.lock().successors.pad(capacity);
                Err(e)
            }
        }
    }
}
