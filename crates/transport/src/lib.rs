//! TCP transport for the Chord ring.
//!
//! This crate carries the ring's RPCs between processes:
//! - Length-prefixed bincode frames
//! - A pooled client implementing [`PeerLink`](chord_core::PeerLink)
//! - An RPC server dispatching inbound requests to a node

pub mod client;
pub mod codec;
pub mod error;
pub mod server;

pub use client::TcpPeerLink;
pub use codec::{read_frame, write_frame, MAX_FRAME_LEN};
pub use error::TransportError;
pub use server::RpcServer;
