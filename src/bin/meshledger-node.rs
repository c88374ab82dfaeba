#![forbid(unsafe_code)]
//! MeshLedger node: serves the ledger API and talks to peers over HTTP.

use clap::Parser;
use meshledger::config::{load_config_from, validate, DEFAULT_CONFIG_PATH};
use meshledger::node::{init_tracing, Node};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "meshledger-node", about = "Run a MeshLedger node")]
struct Args {
    /// Port to listen on (overrides network.port)
    #[arg(long)]
    port: Option<u16>,

    /// URL peers use to reach this node (overrides network.node_url)
    #[arg(long)]
    node_url: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Peer URL to register at startup; may be repeated
    #[arg(short, long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut config = load_config_from(&args.config)?;
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(node_url) = args.node_url {
        config.network.node_url = Some(node_url);
    }
    config.network.bootstrap_peers.extend(args.peers);
    validate(&config)?;

    let node = Arc::new(Node::init(config)?);
    node.start().await?;
    Ok(())
}
