//! Outbound RPC client.

use crate::codec::{read_frame, write_frame};
use crate::error::TransportError;
use async_trait::async_trait;
use chord_core::{Error, NodeRef, PeerLink, Request, Response};
use dashmap::DashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Idle connections kept per peer address.
const MAX_IDLE_PER_PEER: usize = 4;

/// [`PeerLink`] over TCP.
///
/// Each call checks a connection out of a per-address idle pool (or dials a
/// new one), runs one request/response exchange, and returns the connection
/// to the pool only if the exchange succeeded. Calls never share a
/// connection, so a node can be called back while it waits on a peer.
pub struct TcpPeerLink {
    idle: DashMap<String, Vec<TcpStream>>,
    timeout: Duration,
}

impl TcpPeerLink {
    pub fn new(timeout: Duration) -> Self {
        Self {
            idle: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One exchange with whoever listens on `addr`, without a deadline.
    pub async fn call_addr(&self, addr: &str, request: &Request) -> Result<Response, TransportError> {
        if let Some(mut stream) = self.checkout(addr) {
            match exchange(&mut stream, request).await {
                Ok(response) => {
                    self.checkin(addr, stream);
                    return Ok(response);
                }
                // the peer may have dropped an idle connection; retry on a fresh one
                Err(e) => debug!("pooled connection to {} failed: {}", addr, e),
            }
        }

        let mut stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let response = exchange(&mut stream, request).await?;
        self.checkin(addr, stream);
        Ok(response)
    }

    fn checkout(&self, addr: &str) -> Option<TcpStream> {
        self.idle.get_mut(addr).and_then(|mut streams| streams.pop())
    }

    fn checkin(&self, addr: &str, stream: TcpStream) {
        let mut streams = self.idle.entry(addr.to_string()).or_default();
        if streams.len() < MAX_IDLE_PER_PEER {
            streams.push(stream);
        }
    }
}

async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response, TransportError> {
    write_frame(stream, request).await?;
    read_frame(stream).await?.ok_or(TransportError::Closed)
}

#[async_trait]
impl PeerLink for TcpPeerLink {
    async fn call(&self, peer: &NodeRef, request: Request) -> chord_core::Result<Response> {
        let addr = peer.addr();
        match tokio::time::timeout(self.timeout, self.call_addr(&addr, &request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(Error::unreachable(peer, e.to_string())),
            Err(_) => Err(Error::unreachable(
                peer,
                format!("no answer to {} within {:?}", request.method(), self.timeout),
            )),
        }
    }
}
