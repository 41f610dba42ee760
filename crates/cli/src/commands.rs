//! Command implementations.

use crate::config::{ClientArgs, CliConfig, Command, GetArgs, LookupArgs, PutArgs, ServeArgs, SummaryArgs};
use anyhow::{anyhow, bail, Context, Result};
use chord_core::{ChordNode, IdSpace, Identifier, NodeRef, Remote, Request, Response, SipPartitioner, Summary};
use chord_transport::{RpcServer, TcpPeerLink};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// What a command produced, printed by the binary.
#[derive(Debug)]
pub enum CommandResult {
    /// The node ran until interrupted.
    Stopped,
    Owner { id: Identifier, owner: NodeRef },
    Summary(Box<Summary>),
    SummaryJson(String),
    Value { key: String, owner: NodeRef, value: Option<String> },
    Stored { key: String, owner: NodeRef },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Stopped => write!(f, "node stopped"),
            CommandResult::Owner { id, owner } => write!(f, "{} -> {}", id, owner),
            CommandResult::Summary(summary) => write!(f, "{}", summary),
            CommandResult::SummaryJson(json) => write!(f, "{}", json),
            CommandResult::Value { key, owner, value: Some(value) } => {
                write!(f, "{} = {} (on {})", key, value, owner)
            }
            CommandResult::Value { key, owner, value: None } => write!(f, "{} not found on {}", key, owner),
            CommandResult::Stored { key, owner } => write!(f, "{} stored on {}", key, owner),
        }
    }
}

impl CliConfig {
    pub async fn run(self) -> Result<CommandResult> {
        match self.command {
            Command::Serve(args) => serve(args).await,
            Command::Lookup(args) => lookup(args).await,
            Command::Summary(args) => summary(args).await,
            Command::Get(args) => get(args).await,
            Command::Put(args) => put(args).await,
        }
    }
}

/// Binds the RPC server, joins the ring, and runs maintenance until the
/// server stops on ctrl-c.
pub async fn serve(args: ServeArgs) -> Result<CommandResult> {
    let config = args.chord_config();
    let link = TcpPeerLink::new(config.rpc_timeout);
    let node = Arc::new(ChordNode::new(args.me(), config, link).context("invalid node configuration")?);

    let server = RpcServer::bind(&args.listen_addr(), node.clone())
        .await
        .with_context(|| format!("failed to listen on {}", args.listen_addr()))?;
    let server_task = tokio::spawn(server.run_until_ctrl_c());

    node.join(args.known()).await;
    info!("\n{}", node.summary());
    let maintenance = node.start_maintenance();

    let served = server_task.await;
    info!("{} shutting down", node.me());
    maintenance.shutdown();
    served.context("RPC server task failed")?;
    Ok(CommandResult::Stopped)
}

/// A client bound to one ring member, identified by asking it for its summary.
struct Contact {
    link: TcpPeerLink,
    node: NodeRef,
    space: IdSpace,
}

impl Contact {
    async fn open(args: &ClientArgs) -> Result<(Self, Summary)> {
        let link = TcpPeerLink::new(args.timeout());
        let response = tokio::time::timeout(link.timeout(), link.call_addr(&args.via, &Request::Summary))
            .await
            .map_err(|_| anyhow!("{} did not answer within {:?}", args.via, link.timeout()))?
            .with_context(|| format!("failed to reach {}", args.via))?;

        let summary = match response {
            Response::Summary(summary) => summary,
            other => bail!("{} answered {} to a summary request", args.via, other.kind()),
        };
        let space = IdSpace::new(summary.fingers.len() as u32)?;
        let contact = Contact {
            link,
            node: summary.node.clone(),
            space,
        };
        Ok((contact, summary))
    }

    fn remote<'a>(&'a self, peer: &'a NodeRef) -> Remote<'a, TcpPeerLink> {
        Remote::new(&self.link, peer)
    }

    async fn owner_of_key(&self, key: &str) -> Result<NodeRef> {
        let id = SipPartitioner::new(self.space).identifier_for(key);
        Ok(self.remote(&self.node).find_successor(id).await?)
    }
}

pub async fn lookup(args: LookupArgs) -> Result<CommandResult> {
    let (contact, _) = Contact::open(&args.client).await?;
    if !contact.space.contains(Identifier(args.id)) {
        bail!("identifier {} outside of [0, {})", args.id, contact.space.size());
    }
    let id = Identifier(args.id);
    let owner = contact.remote(&contact.node).find_successor(id).await?;
    Ok(CommandResult::Owner { id, owner })
}

pub async fn summary(args: SummaryArgs) -> Result<CommandResult> {
    let (_, summary) = Contact::open(&args.client).await?;
    if args.json {
        return Ok(CommandResult::SummaryJson(serde_json::to_string_pretty(&summary)?));
    }
    Ok(CommandResult::Summary(Box::new(summary)))
}

pub async fn get(args: GetArgs) -> Result<CommandResult> {
    let (contact, _) = Contact::open(&args.client).await?;
    let owner = contact.owner_of_key(&args.key).await?;
    let value = contact.remote(&owner).fetch(args.key.as_str()).await?;
    Ok(CommandResult::Value {
        key: args.key,
        owner,
        value,
    })
}

pub async fn put(args: PutArgs) -> Result<CommandResult> {
    let (contact, _) = Contact::open(&args.client).await?;
    let owner = contact.owner_of_key(&args.key).await?;
    contact
        .remote(&owner)
        .insert(args.key.as_str(), args.value)
        .await
        .with_context(|| format!("{} refused {}", owner, args.key))?;
    Ok(CommandResult::Stored { key: args.key, owner })
}
