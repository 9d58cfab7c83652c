use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL
    #[arg(long, global = true, env = "LEDGER_NODE", default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the whole chain
    Chain,
    /// Print the chain length
    Length,
    /// Print blocks newest first, from `start` up to `end`
    Range {
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value_t = 10)]
        end: usize,
    },
    /// Mine pending transactions into a block
    Mine,
    /// Send funds from the node's wallet
    Transact {
        /// Recipient address
        #[arg(long)]
        recipient: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
    /// Print the node wallet's address and balance
    Wallet,
    /// Print every address seen in the chain
    KnownAddresses,
    /// Print pending transactions
    Pool,
}

#[derive(Serialize)]
struct TransactBody {
    recipient: String,
    amount: u64,
}

fn endpoint(node: &str, path: &str) -> String {
    format!("{}{}", node.trim_end_matches('/'), path)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let node = cli.node.as_str();

    let req = match cli.cmd {
        Command::Chain => client.get(endpoint(node, "/blockchain")),
        Command::Length => client.get(endpoint(node, "/blockchain/length")),
        Command::Range { start, end } => client
            .get(endpoint(node, "/blockchain/range"))
            .query(&[("start", start), ("end", end)]),
        Command::Mine => client.post(endpoint(node, "/blockchain/mine")),
        Command::Transact { recipient, amount } => client
            .post(endpoint(node, "/wallet/transact"))
            .json(&TransactBody { recipient, amount }),
        Command::Wallet => client.get(endpoint(node, "/wallet/info")),
        Command::KnownAddresses => client.get(endpoint(node, "/known-addresses")),
        Command::Pool => client.get(endpoint(node, "/transactions")),
    };

    let res = req.send().await?;
    let status = res.status();
    debug!("node answered {}", status);
    let body = res.text().await?;
    let pretty = serde_json::from_str::<serde_json::Value>(&body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or(body);
    println!("status: {}", status);
    println!("{pretty}");
    Ok(())
}
