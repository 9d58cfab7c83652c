mod constants;
mod relay;
mod routes;
mod seed;

use anyhow::Context;
use clap::Parser;
use ledger_core::{Block, Node, Wallet};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn, Level};

use crate::constants::DEFAULT_LISTEN;
use crate::relay::HttpRelay;

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, env = "LEDGER_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Base URL of a peer to relay blocks and transactions to; repeatable
    #[arg(long = "peer", env = "LEDGER_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Base URL of a node whose chain is adopted at startup
    #[arg(long, env = "LEDGER_SYNC_FROM")]
    sync_from: Option<String>,

    /// Mine demo blocks and pending transactions before serving
    #[arg(long, env = "LEDGER_SEED_DATA")]
    seed_data: bool,
}

async fn sync_chain(node: Arc<Node>, root: &str) -> anyhow::Result<()> {
    let url = format!("{}/blockchain", root.trim_end_matches('/'));
    let blocks: Vec<Block> = reqwest::get(&url)
        .await?
        .error_for_status()?
        .json()
        .await
        .with_context(|| format!("decoding chain from {url}"))?;
    let length = blocks.len();
    tokio::task::spawn_blocking(move || node.replace_chain(blocks)).await??;
    info!("Synced local chain from {} ({} blocks)", root, length);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let relay = HttpRelay::new(args.peers.clone(), tokio::runtime::Handle::current());
    let node = Arc::new(Node::new(Wallet::new(), Arc::new(relay)));
    info!(
        "Node wallet {} relaying to {} peer(s)",
        node.wallet().address(),
        args.peers.len()
    );

    if let Some(root) = &args.sync_from {
        if let Err(err) = sync_chain(node.clone(), root).await {
            warn!("Error syncing from {}: {:#}", root, err);
        }
    }

    if args.seed_data {
        let seeding = node.clone();
        tokio::task::spawn_blocking(move || {
            seed::seed_demo_data(&seeding, &mut rand::thread_rng())
        })
        .await??;
    }

    let app = routes::router(node);
    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
