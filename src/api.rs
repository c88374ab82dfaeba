//! REST API for a MeshLedger node
//!
//! Maps HTTP routes onto ledger operations and peer fan-out. Route paths and
//! JSON field names are shared by every node, so peers can call each other.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::blockchain::{AddressData, Block, Blockchain, BlockOutcome, LedgerSnapshot};
use crate::error::ChainError;
use crate::miner;
use crate::network::{NetworkNode, ReceiveBlockRequest, RegisterNodeRequest, RegisterNodesBulkRequest};
use crate::node::NodeState;
use crate::persistence::{InMemoryPersistence, Persistence};
use crate::transaction::{NewTransactionRequest, Transaction, TransactionRequest};

/// Shared handle passed to every route handler
#[derive(Clone)]
pub struct Node {
    pub blockchain: Arc<RwLock<Blockchain>>,
    pub network: Arc<NetworkNode>,
    pub persistence: Arc<dyn Persistence>,
    // Optional orchestrator state for health checks and logging
    pub state: Option<Arc<RwLock<NodeState>>>,
    // Serializes local mining so two searches never race for the same tip
    mining: Arc<Mutex<()>>,
    blocks_mined: Arc<AtomicU64>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    blocks_received: u64,
    blocks_rejected: u64,
    consensus_runs: u64,
    chains_replaced: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    /// Standalone node with an in-memory store, mostly for tests.
    pub fn new(blockchain: Blockchain, network: NetworkNode) -> Self {
        Self::new_shared(
            Arc::new(RwLock::new(blockchain)),
            Arc::new(network),
            Arc::new(InMemoryPersistence::new()),
            None,
        )
    }

    /// API node sharing the orchestrator's ledger, peer set and store.
    pub fn new_shared(
        blockchain: Arc<RwLock<Blockchain>>,
        network: Arc<NetworkNode>,
        persistence: Arc<dyn Persistence>,
        state: Option<Arc<RwLock<NodeState>>>,
    ) -> Self {
        Self {
            blockchain,
            network,
            persistence,
            state,
            mining: Arc::new(Mutex::new(())),
            blocks_mined: Arc::new(AtomicU64::new(0)),
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    fn persist(&self, blockchain: &Blockchain) -> Result<(), ApiError> {
        self.persistence
            .save_snapshot(&blockchain.snapshot())
            .map_err(|e| {
                warn!(error = %e, "persistence.save_failed");
                ApiError::BlockchainError(e)
            })
    }

    /// Mine the current pending pool into a new block.
    ///
    /// The whole round runs on its own task, so a caller that goes away only
    /// stops waiting: the search still commits and persists its block.
    pub async fn mine_block(&self) -> Result<Block, ApiError> {
        let node = self.clone();
        tokio::spawn(async move { node.mine_and_commit().await })
            .await
            .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))?
    }

    /// The nonce search runs on a blocking worker without the ledger lock, so
    /// reads stay responsive. If the tip moves meanwhile the block is discarded.
    async fn mine_and_commit(&self) -> Result<Block, ApiError> {
        let _mining = self.mining.lock().await;

        let candidate = self.blockchain.read().await.prepare_candidate();
        let search = candidate.clone();
        let start = Instant::now();
        let proof = tokio::task::spawn_blocking(move || miner::mine_candidate(&search))
            .await
            .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))??;

        let mut blockchain = self.blockchain.write().await;
        let block = blockchain.commit_mined(candidate, proof)?;
        self.blocks_mined.fetch_add(1, Ordering::SeqCst);
        info!(
            index = block.index,
            transactions = block.transactions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mining.block_committed"
        );
        self.persist(&blockchain)?;
        Ok(block)
    }

    /// Fetch peer snapshots and adopt the longest valid chain among them.
    pub async fn run_consensus(&self) -> Result<bool, ApiError> {
        let peers = self.network.fetch_snapshots().await;

        let mut blockchain = self.blockchain.write().await;
        let replaced = blockchain.resolve_consensus(peers);
        if replaced {
            self.persist(&blockchain)?;
        }
        drop(blockchain);

        let mut stats = self.api_stats.write().await;
        stats.consensus_runs += 1;
        if replaced {
            stats.chains_replaced += 1;
        }
        Ok(replaced)
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            blocks_mined: self.blocks_mined(),
            blocks_received: stats.blocks_received,
            blocks_rejected: stats.blocks_rejected,
            consensus_runs: stats.consensus_runs,
            chains_replaced: stats.chains_replaced,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BlockchainError(ChainError),
    InvalidInput(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlockchainError(e) => {
                let status = match &e {
                    ChainError::InvalidTransaction(_)
                    | ChainError::InvalidBlock(_)
                    | ChainError::InvalidChain(_) => StatusCode::BAD_REQUEST,
                    ChainError::StaleCandidate { .. } => StatusCode::CONFLICT,
                    ChainError::NetworkError(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::BlockchainError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct NoteResponse {
    note: String,
}

impl NoteResponse {
    fn new(note: impl Into<String>) -> Json<Self> {
        Json(NoteResponse { note: note.into() })
    }
}

/// Full node view served to peers during consensus.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainResponse {
    #[serde(flatten)]
    pub snapshot: LedgerSnapshot,
    pub current_node_url: String,
    pub network_nodes: Vec<String>,
}

#[derive(Serialize)]
struct BroadcastTransactionResponse {
    note: String,
    transaction: Transaction,
}

#[derive(Serialize)]
struct MineResponse {
    note: String,
    block: Block,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiveBlockResponse {
    note: String,
    accepted: bool,
    new_block: Block,
}

#[derive(Serialize)]
struct ConsensusResponse {
    note: String,
    replaced: bool,
    chain: Vec<Block>,
}

#[derive(Serialize)]
struct BlockLookupResponse {
    block: Option<Block>,
}

#[derive(Serialize)]
struct TransactionLookupResponse {
    transaction: Option<Transaction>,
    block: Option<Block>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressResponse {
    address_data: AddressData,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub blocks_mined: u64,
    pub blocks_received: u64,
    pub blocks_rejected: u64,
    pub consensus_runs: u64,
    pub chains_replaced: u64,
    pub uptime_seconds: u64,
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status, duration and current `NodeState` (when available).
async fn logging_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    let node_state = if let Some(s) = &node.state {
        format!("{:?}", s.read().await.clone())
    } else {
        "unknown".to_string()
    };

    info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Ledger snapshot and mutation
        .route("/blockchain", get(get_blockchain))
        .route("/transaction", post(submit_transaction))
        .route("/transaction/broadcast", post(broadcast_transaction))
        .route("/mine", get(mine))
        .route("/receive-new-block", post(receive_new_block))
        .route("/consensus", get(consensus))
        // Peer registration
        .route("/register-and-broadcast-node", post(register_and_broadcast_node))
        .route("/register-node", post(register_node))
        .route("/register-nodes-bulk", post(register_nodes_bulk))
        // Explorer queries
        .route("/block/:block_hash", get(get_block))
        .route("/transaction/:transaction_id", get(get_transaction))
        .route("/address/:address", get(get_address))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Arc<Node>, port: u16) -> Result<(), ChainError> {
    let app = build_api_router(node);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "api.listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let state = match &node.state {
        Some(s) => Some(s.read().await.clone()),
        None => None,
    };
    let healthy = matches!(state, None | Some(NodeState::Ready));
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "node_state": state.map(|s| format!("{:?}", s)),
            "chain_length": node.blockchain.read().await.len(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

async fn get_blockchain(State(node): State<Arc<Node>>) -> Json<BlockchainResponse> {
    let snapshot = node.blockchain.read().await.snapshot();
    Json(BlockchainResponse {
        snapshot,
        current_node_url: node.network.current_node_url().to_string(),
        network_nodes: node.network.list_peers().await,
    })
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<NoteResponse>, ApiError> {
    req.validate()?;
    let tx = req.into_transaction();

    let block_index = {
        let mut blockchain = node.blockchain.write().await;
        let block_index = blockchain.add_pending_transaction(tx);
        node.persist(&blockchain)?;
        block_index
    };

    node.api_stats.write().await.transactions_submitted += 1;

    Ok(NoteResponse::new(format!(
        "Transaction will be added in block {}.",
        block_index
    )))
}

async fn broadcast_transaction(
    State(node): State<Arc<Node>>,
    Json(req): Json<NewTransactionRequest>,
) -> Result<Json<BroadcastTransactionResponse>, ApiError> {
    req.validate()?;

    let transaction = {
        let mut blockchain = node.blockchain.write().await;
        let tx = blockchain.create_transaction(req.amount, req.sender, req.recipient);
        blockchain.add_pending_transaction(tx.clone());
        node.persist(&blockchain)?;
        tx
    };

    node.api_stats.write().await.transactions_submitted += 1;
    node.network.broadcast_transaction(&transaction).await;

    Ok(Json(BroadcastTransactionResponse {
        note: "Transaction created and broadcast successfully.".to_string(),
        transaction,
    }))
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine_block().await?;
    node.network.broadcast_block(&block).await;

    Ok(Json(MineResponse {
        note: "New block mined and broadcast successfully.".to_string(),
        block,
    }))
}

async fn receive_new_block(
    State(node): State<Arc<Node>>,
    Json(req): Json<ReceiveBlockRequest>,
) -> Result<Json<ReceiveBlockResponse>, ApiError> {
    let outcome = {
        let mut blockchain = node.blockchain.write().await;
        let outcome = blockchain.receive_external_block(req.new_block.clone());
        if outcome.is_accepted() {
            node.persist(&blockchain)?;
        }
        outcome
    };

    let accepted = outcome.is_accepted();
    let mut stats = node.api_stats.write().await;
    let note = match outcome {
        BlockOutcome::Accepted => {
            stats.blocks_received += 1;
            "New block received and accepted.".to_string()
        }
        BlockOutcome::Rejected(reason) => {
            stats.blocks_rejected += 1;
            format!("New block rejected: {}.", reason)
        }
    };

    Ok(Json(ReceiveBlockResponse {
        note,
        accepted,
        new_block: req.new_block,
    }))
}

async fn consensus(State(node): State<Arc<Node>>) -> Result<Json<ConsensusResponse>, ApiError> {
    let replaced = node.run_consensus().await?;
    let chain = node.blockchain.read().await.blocks().to_vec();

    let note = if replaced {
        "This chain has been replaced."
    } else {
        "Current chain has not been replaced."
    };

    Ok(Json(ConsensusResponse {
        note: note.to_string(),
        replaced,
        chain,
    }))
}

async fn register_and_broadcast_node(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterNodeRequest>,
) -> Result<Json<NoteResponse>, ApiError> {
    if req.new_node_url.trim().is_empty() {
        return Err(ApiError::InvalidInput("newNodeUrl must not be empty".to_string()));
    }
    node.network.broadcast_registration(&req.new_node_url).await?;
    Ok(NoteResponse::new("New node registered with network successfully."))
}

async fn register_node(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterNodeRequest>,
) -> Json<NoteResponse> {
    node.network.register_peer(&req.new_node_url).await;
    NoteResponse::new("New node registered successfully.")
}

async fn register_nodes_bulk(
    State(node): State<Arc<Node>>,
    Json(req): Json<RegisterNodesBulkRequest>,
) -> Json<NoteResponse> {
    node.network.register_peers_bulk(&req.all_network_nodes).await;
    NoteResponse::new("Bulk registration successful.")
}

async fn get_block(
    State(node): State<Arc<Node>>,
    Path(block_hash): Path<String>,
) -> Json<BlockLookupResponse> {
    let blockchain = node.blockchain.read().await;
    Json(BlockLookupResponse {
        block: blockchain.get_block(&block_hash).cloned(),
    })
}

async fn get_transaction(
    State(node): State<Arc<Node>>,
    Path(transaction_id): Path<String>,
) -> Json<TransactionLookupResponse> {
    let blockchain = node.blockchain.read().await;
    let (transaction, block) = match blockchain.get_transaction(&transaction_id) {
        Some((tx, block)) => (Some(tx.clone()), Some(block.clone())),
        None => (None, None),
    };
    Json(TransactionLookupResponse { transaction, block })
}

async fn get_address(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> Json<AddressResponse> {
    let blockchain = node.blockchain.read().await;
    Json(AddressResponse {
        address_data: blockchain.get_address_data(&address),
    })
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    Json(node.get_stats().await)
}
