//! Command-line configuration.

use chord_core::{ChordConfig, NodeRef, DEFAULT_ID_BITS};
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "chord", author, version, about = "Chord distributed hash table node and client")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a ring member: join through a known node, or found a new ring.
    Serve(ServeArgs),
    /// Ask a node which node owns an identifier.
    Lookup(LookupArgs),
    /// Print a node's predecessor, finger table and successor list.
    Summary(SummaryArgs),
    /// Fetch a key from the node that owns it.
    Get(GetArgs),
    /// Store a key on the node that owns it.
    Put(PutArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Identifier of this node, in [0, 2^bits).
    #[arg(long)]
    pub id: u64,

    /// Address to listen on and to advertise to peers.
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    #[arg(long)]
    pub port: u16,

    /// Identifier of a ring member to join through.
    #[arg(long, requires = "known_port")]
    pub known_id: Option<u64>,

    /// Address of the known member. Defaults to `--ip`.
    #[arg(long, requires = "known_id")]
    pub known_ip: Option<String>,

    #[arg(long, requires = "known_id")]
    pub known_port: Option<u16>,

    /// Bit length of the identifier space; every member must agree.
    #[arg(long, default_value_t = DEFAULT_ID_BITS)]
    pub bits: u32,

    #[arg(long, default_value_t = 3000)]
    pub stabilize_ms: u64,

    #[arg(long, default_value_t = 3000)]
    pub fix_fingers_ms: u64,

    #[arg(long, default_value_t = 1000)]
    pub check_predecessor_ms: u64,

    /// Deadline for one remote call before the peer counts as dead.
    #[arg(long, default_value_t = 2000)]
    pub rpc_timeout_ms: u64,
}

impl ServeArgs {
    pub fn me(&self) -> NodeRef {
        NodeRef::new(self.id, self.ip.clone(), self.port)
    }

    pub fn known(&self) -> Option<NodeRef> {
        match (self.known_id, self.known_port) {
            (Some(id), Some(port)) => {
                let ip = self.known_ip.clone().unwrap_or_else(|| self.ip.clone());
                Some(NodeRef::new(id, ip, port))
            }
            _ => None,
        }
    }

    pub fn chord_config(&self) -> ChordConfig {
        ChordConfig::new(self.bits)
            .with_stabilize_interval(Duration::from_millis(self.stabilize_ms))
            .with_fix_fingers_interval(Duration::from_millis(self.fix_fingers_ms))
            .with_check_predecessor_interval(Duration::from_millis(self.check_predecessor_ms))
            .with_rpc_timeout(Duration::from_millis(self.rpc_timeout_ms))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Where client commands send their first request.
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Any ring member, as `ip:port`.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub via: String,

    #[arg(long, default_value_t = 2000)]
    pub timeout_ms: u64,
}

impl ClientArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Identifier to resolve.
    pub id: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Print the state as JSON instead of the text dump.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    pub key: String,
}

#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    pub key: String,

    pub value: String,
}
