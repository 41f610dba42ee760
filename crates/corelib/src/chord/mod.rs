//! A Chord ring member.
//!
//! [`ChordNode`] owns one node's [`NodeState`] and implements routing,
//! joining and maintenance on top of a [`PeerLink`]. The pieces live in
//! submodules:
//!
//! - `router`: `find_successor`, `find_predecessor` and the local/remote
//!   dispatch between [`Local`] and [`Remote`].
//! - `join`: `join`, `init_finger_table`, `update_others`,
//!   `update_finger_table` and key migration.
//! - `stabilize`: `stabilize`, `notify`, `fix_fingers`, the liveness checks
//!   and successor-list upkeep.
//! - `maintenance`: the periodic tasks that drive `stabilize`.
//!
//! # Locking
//!
//! State sits behind a single mutex that is never held across an `.await`.
//! Every operation snapshots what it needs, makes its remote calls unlocked
//! and applies the outcome in one short critical section.

mod join;
mod maintenance;
mod router;
mod stabilize;

pub use maintenance::{spawn_maintenance, Maintenance};
pub use router::Local;

use crate::config::ChordConfig;
use crate::error::{Error, Result};
use crate::node::NodeRef;
use crate::peer::{PeerLink, Remote};
use crate::protocol::{Request, Response};
use crate::ring::{FingerEntry, IdSpace};
use crate::state::{NodeState, Phase, Summary};
use crate::store::KvStore;
use parking_lot::Mutex;
use tracing::{debug, info};

pub struct ChordNode<L> {
    me: NodeRef,
    space: IdSpace,
    config: ChordConfig,
    state: Mutex<NodeState>,
    store: KvStore,
    link: L,
}

impl<L: PeerLink> ChordNode<L> {
    /// Creates an unjoined node. Call [`join`](Self::join) before serving.
    pub fn new(me: NodeRef, config: ChordConfig, link: L) -> Result<Self> {
        let space = config.validate()?;
        if !space.contains(me.id) {
            return Err(Error::InvalidConfig(format!(
                "identifier {} outside of [0, {})",
                me.id,
                space.size()
            )));
        }

        Ok(Self {
            state: Mutex::new(NodeState::new(me.clone(), space)),
            store: KvStore::new(space),
            me,
            space,
            config,
            link,
        })
    }

    pub fn me(&self) -> &NodeRef {
        &self.me
    }

    pub fn space(&self) -> IdSpace {
        self.space
    }

    pub fn config(&self) -> &ChordConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn successor(&self) -> NodeRef {
        self.state.lock().successor()
    }

    pub fn predecessor(&self) -> Option<NodeRef> {
        self.state.lock().predecessor.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_isolated(&self) -> bool {
        self.state.lock().is_isolated()
    }

    pub fn summary(&self) -> Summary {
        self.state.lock().summary()
    }

    /// A copy of the whole ring-local state.
    pub fn snapshot(&self) -> NodeState {
        self.state.lock().clone()
    }

    fn remote<'a>(&'a self, peer: &'a NodeRef) -> Remote<'a, L> {
        Remote::new(&self.link, peer)
    }

    fn finger(&self, index: usize) -> Result<FingerEntry> {
        self.state
            .lock()
            .fingers
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InvariantViolation(format!("no finger at index {}", index)))
    }

    /// Server-side dispatch for every inbound RPC.
    pub async fn handle_request(&self, request: Request) -> Response {
        debug!("{} serving {}", self.me, request.method());

        match request {
            Request::GetPredecessor => Response::Predecessor(self.predecessor()),
            Request::SetPredecessor(node) => {
                info!("{} predecessor set to {}", self.me, node);
                self.state.lock().predecessor = Some(node);
                Response::Ack
            }
            Request::FindSuccessor { id, queried } => {
                if !queried.is(&self.me) {
                    debug!("{} answering find_successor addressed to {}", self.me, queried);
                }
                match self.find_successor(id).await {
                    Ok(node) => Response::Node(node),
                    Err(e) => Response::Rejected(e.to_string()),
                }
            }
            Request::GetSuccessor => Response::Node(self.successor()),
            Request::GetSuccessorList => Response::Nodes(self.state.lock().successors.live()),
            Request::ClosestPrecedingFinger { id, .. } => {
                Response::Node(self.closest_preceding_finger_local(id))
            }
            Request::UpdateFingerTable { node, index } => {
                match self.update_finger_table(node, index).await {
                    Ok(()) => Response::Ack,
                    Err(e) => Response::Rejected(e.to_string()),
                }
            }
            Request::Notify(node) => {
                self.notify(node);
                Response::Ack
            }
            Request::Summary => {
                let summary = self.summary();
                info!("\n{}", summary);
                Response::Summary(summary)
            }
            Request::Fetch { key } => Response::Value(self.store.get(&key)),
            Request::Insert { key, value } => {
                if self.store.insert(key.clone(), value) {
                    Response::Ack
                } else {
                    Response::Rejected(format!("key {} already exists", key))
                }
            }
            Request::TransferKeys { lower, upper } => {
                let entries = self.store.drain_range(lower, upper);
                if !entries.is_empty() {
                    info!("{} handing over {} keys in ({}, {}]", self.me, entries.len(), lower, upper);
                }
                Response::Entries(entries)
            }
        }
    }

    /// Looks up the value stored under `key` on the node that owns it.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let owner = self.find_successor(self.store.identifier_of(key)).await?;
        if owner.is(&self.me) {
            return Ok(self.store.get(key));
        }
        self.remote(&owner).fetch(key).await
    }

    /// Stores `key` on the node that owns it. Fails with
    /// [`Error::Rejected`] if the key already exists there.
    pub async fn put(&self, key: &str, value: &str) -> Result<NodeRef> {
        let owner = self.find_successor(self.store.identifier_of(key)).await?;
        if owner.is(&self.me) {
            if !self.store.insert(key.to_string(), value.to_string()) {
                return Err(Error::Rejected(format!("key {} already exists", key)));
            }
        } else {
            self.remote(&owner).insert(key, value).await?;
        }
        Ok(owner)
    }
}
