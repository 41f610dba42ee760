//! Core library for a Chord distributed hash table.
//!
//! This crate provides the ring itself, independent of any transport:
//! - Identifier-space arithmetic, finger tables and successor lists
//! - Per-node state and the RPC message types
//! - Routing, joining and stabilization ([`ChordNode`])
//! - The [`PeerLink`] seam a transport plugs into
//! - Key partitioning and the local key/value store

pub mod chord;
pub mod config;
pub mod error;
pub mod node;
pub mod partitioner;
pub mod peer;
pub mod protocol;
pub mod ring;
pub mod state;
pub mod store;

pub use chord::{spawn_maintenance, ChordNode, Local, Maintenance};
pub use config::{ChordConfig, DEFAULT_ID_BITS};
pub use error::{Error, Result};
pub use node::{Identifier, NodeRef};
pub use partitioner::{Partitioner, SipPartitioner};
pub use peer::{PeerLink, Remote, RingPeer};
pub use protocol::{Request, Response};
pub use ring::{FingerTable, IdSpace, Interval, SuccessorList};
pub use state::{NodeState, Phase, Summary};
pub use store::KvStore;
