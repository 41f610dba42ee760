//! Inbound RPC server.

use crate::codec::{read_frame, write_frame};
use crate::error::TransportError;
use chord_core::{ChordNode, PeerLink, Request};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tracing::{debug, info, warn};

/// Serves one node's RPC surface. Each connection gets its own task and
/// may carry any number of sequential request/response exchanges.
pub struct RpcServer<L> {
    listener: TcpListener,
    node: Arc<ChordNode<L>>,
}

impl<L: PeerLink> RpcServer<L> {
    pub fn new(listener: TcpListener, node: Arc<ChordNode<L>>) -> Self {
        Self { listener, node }
    }

    pub async fn bind(addr: &str, node: Arc<ChordNode<L>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, node))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until `shutdown` resolves. Connections already
    /// being served finish on their own.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let RpcServer { listener, node } = self;
        tokio::pin!(shutdown);
        info!("{} serving RPC on {:?}", node.me(), listener.local_addr().ok());

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("{} RPC server shutting down", node.me());
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => spawn_connection(stream, peer, &node),
                        Err(e) => warn!("failed to accept connection: {}", e),
                    }
                }
            }
        }
    }

    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to install ctrl-c handler: {}", e);
            }
        })
        .await
    }
}

fn spawn_connection<L: PeerLink>(stream: TcpStream, peer: SocketAddr, node: &Arc<ChordNode<L>>) {
    let node = Arc::clone(node);
    tokio::spawn(async move {
        if let Err(e) = serve_connection(stream, node).await {
            debug!("connection from {} closed: {}", peer, e);
        }
    });
}

async fn serve_connection<L: PeerLink>(mut stream: TcpStream, node: Arc<ChordNode<L>>) -> Result<(), TransportError> {
    stream.set_nodelay(true)?;
    while let Some(request) = read_frame::<_, Request>(&mut stream).await? {
        let response = node.handle_request(request).await;
        write_frame(&mut stream, &response).await?;
    }
    Ok(())
}
