//! Peer set and HTTP fan-out between ledger nodes.
//!
//! The peer list is a flat, deduplicated list of node URLs that never contains
//! this node's own URL. Every fan-out contacts all peers concurrently and
//! reports the ones that answered; unreachable peers are logged and skipped.

use crate::blockchain::{Block, LedgerSnapshot};
use crate::error::ChainError;
use crate::transaction::{Transaction, TransactionRequest};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeRequest {
    pub new_node_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodesBulkRequest {
    pub all_network_nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBlockRequest {
    pub new_block: Block,
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

pub struct NetworkNode {
    current_node_url: String,
    peers: RwLock<Vec<String>>,
    client: Client,
}

impl NetworkNode {
    pub fn new(current_node_url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()?;

        Ok(Self {
            current_node_url: normalize_url(&current_node_url.into()),
            peers: RwLock::new(Vec::new()),
            client,
        })
    }

    pub fn current_node_url(&self) -> &str {
        &self.current_node_url
    }

    /// Add a peer unless it is empty, already known, or this node itself.
    /// Returns whether the list changed.
    pub async fn register_peer(&self, url: &str) -> bool {
        let url = normalize_url(url);
        if url.is_empty() || url == self.current_node_url {
            return false;
        }
        let mut peers = self.peers.write().await;
        if peers.contains(&url) {
            return false;
        }
        debug!(peer = %url, "network.peer_registered");
        peers.push(url);
        true
    }

    /// Returns how many of `urls` were new.
    pub async fn register_peers_bulk(&self, urls: &[String]) -> usize {
        let mut added = 0;
        for url in urls {
            if self.register_peer(url).await {
                added += 1;
            }
        }
        added
    }

    pub async fn list_peers(&self) -> Vec<String> {
        self.peers.read().await.clone()
    }

    async fn post_all<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Vec<String> {
        let peers = self.list_peers().await;
        let requests = peers.iter().map(|peer| async move {
            let url = format!("{}{}", peer, path);
            let result = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .and_then(|response| response.error_for_status());
            match result {
                Ok(_) => Some(peer.clone()),
                Err(e) => {
                    warn!(peer = %peer, path, error = %e, "network.fanout_failed");
                    None
                }
            }
        });
        join_all(requests).await.into_iter().flatten().collect()
    }

    /// Forward a transaction to every peer's submit route.
    pub async fn broadcast_transaction(&self, tx: &Transaction) -> Vec<String> {
        let body = TransactionRequest::from(tx.clone());
        self.post_all("/transaction", &body).await
    }

    /// Offer a freshly mined block to every peer.
    pub async fn broadcast_block(&self, block: &Block) -> Vec<String> {
        let body = ReceiveBlockRequest {
            new_block: block.clone(),
        };
        self.post_all("/receive-new-block", &body).await
    }

    /// Register `new_node_url` locally, announce it to every known peer, then
    /// hand the new node the full membership list (including this node).
    pub async fn broadcast_registration(&self, new_node_url: &str) -> Result<(), ChainError> {
        let new_node_url = normalize_url(new_node_url);
        self.register_peer(&new_node_url).await;

        let announce = RegisterNodeRequest {
            new_node_url: new_node_url.clone(),
        };
        self.post_all("/register-node", &announce).await;

        let mut all_network_nodes = self.list_peers().await;
        all_network_nodes.push(self.current_node_url.clone());
        let bulk = RegisterNodesBulkRequest { all_network_nodes };

        self.client
            .post(format!("{}/register-nodes-bulk", new_node_url))
            .json(&bulk)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Fetch the ledger snapshot of every reachable peer. Peers that fail or
    /// answer with something unparseable are left out entirely.
    pub async fn fetch_snapshots(&self) -> Vec<LedgerSnapshot> {
        let peers = self.list_peers().await;
        let requests = peers.iter().map(|peer| async move {
            let url = format!("{}/blockchain", peer);
            let result = async {
                self.client
                    .get(&url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<LedgerSnapshot>()
                    .await
            }
            .await;
            match result {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(peer = %peer, error = %e, "network.snapshot_fetch_failed");
                    None
                }
            }
        });
        join_all(requests).await.into_iter().flatten().collect()
    }
}
