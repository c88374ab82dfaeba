use crate::blockchain::Blockchain;
use crate::config::Config;
use crate::error::ChainError;
use crate::network::NetworkNode;
use crate::persistence::{Database, InMemoryPersistence, Persistence};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Syncing,
    Ready,
}

/// Install the global fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub struct Node {
    pub config: Config,
    pub persistence: Arc<dyn Persistence>,
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub network: Arc<NetworkNode>,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    pub fn init(config: Config) -> Result<Self, ChainError> {
        let node_url = config.network.node_url();
        info!(node_url = %node_url, port = config.network.port, "Starting MeshLedger node");

        let persistence: Arc<dyn Persistence> = match &config.database.path {
            Some(path) => {
                let db_path = std::path::Path::new(path);
                if let Some(parent) = db_path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                match Database::open(path) {
                    Ok(db) => Arc::new(db),
                    Err(e) => {
                        warn!("Failed to open DB at {}: {}. Falling back to in-memory persistence.", path, e);
                        Arc::new(InMemoryPersistence::new())
                    }
                }
            }
            None => Arc::new(InMemoryPersistence::new()),
        };

        // A store that fails to restore is left untouched for the operator.
        let policy = config.consensus.receive_policy();
        let blockchain = persistence.load_blockchain(policy).map_err(|e| {
            warn!(error = %e, "ledger.restore_failed");
            ChainError::DatabaseError(format!("Stored ledger could not be restored: {}", e))
        })?;
        info!(chain_length = blockchain.len(), pending = blockchain.mempool().len(), "ledger.loaded");

        let network = NetworkNode::new(
            node_url,
            Duration::from_secs(config.network.request_timeout_secs),
        )?;

        Ok(Self {
            config,
            persistence,
            blockchain: Arc::new(RwLock::new(blockchain)),
            network: Arc::new(network),
            state: Arc::new(RwLock::new(NodeState::Booting)),
        })
    }

    /// Handle for the HTTP layer sharing this node's ledger, peers and store.
    #[cfg(feature = "api")]
    pub fn api_node(&self) -> crate::api::Node {
        crate::api::Node::new_shared(
            self.blockchain.clone(),
            self.network.clone(),
            self.persistence.clone(),
            Some(self.state.clone()),
        )
    }

    /// Register bootstrap peers, catch up with them once, then serve the API
    /// until the server stops.
    #[cfg(feature = "api")]
    pub async fn start(self: Arc<Self>) -> Result<(), ChainError> {
        let api_node = Arc::new(self.api_node());

        for peer in &self.config.network.bootstrap_peers {
            self.network.register_peer(peer).await;
        }

        *self.state.write().await = NodeState::Syncing;
        if !self.config.network.bootstrap_peers.is_empty() {
            match api_node.run_consensus().await {
                Ok(replaced) => info!(replaced, "startup consensus finished"),
                Err(e) => warn!("Startup consensus failed: {:?}", e),
            }
        }
        *self.state.write().await = NodeState::Ready;

        crate::api::run_api_server(api_node, self.config.network.port).await
    }
}
