//! Integration tests for the MeshLedger HTTP routes
//!
//! A single node with no peers, so every fan-out is a no-op and the responses
//! reflect local ledger state only.

use axum_test::TestServer;
use meshledger::api::{build_api_router, Node};
use meshledger::blockchain::{Block, Blockchain};
use meshledger::network::NetworkNode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

fn test_server() -> TestServer {
    let network = NetworkNode::new("http://localhost:3001", Duration::from_secs(1))
        .expect("Failed to create network node");
    let node = Arc::new(Node::new(Blockchain::new(), network));
    TestServer::new(build_api_router(node)).expect("Failed to create test server")
}

#[tokio::test]
async fn test_blockchain_starts_at_genesis() {
    let server = test_server();

    let response = server.get("/blockchain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();

    let chain = json["chain"].as_array().unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0]["index"], 1);
    assert_eq!(chain[0]["nonce"], 100);
    assert_eq!(chain[0]["hash"], "0");
    assert_eq!(chain[0]["previousBlockHash"], "0");
    assert_eq!(json["pendingTransactions"], json!([]));
    assert_eq!(json["currentNodeUrl"], "http://localhost:3001");
    assert_eq!(json["networkNodes"], json!([]));
}

#[tokio::test]
async fn test_submit_mine_and_query() {
    let server = test_server();

    let response = server
        .post("/transaction")
        .json(&json!({
            "amount": 10,
            "sender": "A",
            "recipient": "B",
            "transactionId": "tx-1"
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["note"], "Transaction will be added in block 2.");

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(json["pendingTransactions"][0]["transactionId"], "tx-1");

    let response = server.get("/mine").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["note"], "New block mined and broadcast successfully.");
    let block: Block = serde_json::from_value(json["block"].clone()).unwrap();
    assert_eq!(block.index, 2);
    assert_eq!(block.previous_block_hash, "0");
    assert!(block.hash.starts_with("0000"));
    assert_eq!(block.transactions.len(), 1);

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(json["chain"].as_array().unwrap().len(), 2);
    assert_eq!(json["pendingTransactions"], json!([]));

    let json: Value = server.get(&format!("/block/{}", block.hash)).await.json();
    assert_eq!(json["block"]["index"], 2);

    let json: Value = server.get("/transaction/tx-1").await.json();
    assert_eq!(json["transaction"]["sender"], "A");
    assert_eq!(json["block"]["hash"], block.hash.as_str());

    let json: Value = server.get("/address/B").await.json();
    assert_eq!(json["addressData"]["addressBalance"], 10.0);
    assert_eq!(
        json["addressData"]["addressTransactions"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let json: Value = server.get("/address/A").await.json();
    assert_eq!(json["addressData"]["addressBalance"], -10.0);
}

#[tokio::test]
async fn test_unknown_lookups_return_null() {
    let server = test_server();

    let json: Value = server.get("/block/deadbeef").await.json();
    assert!(json["block"].is_null());

    let json: Value = server.get("/transaction/missing").await.json();
    assert!(json["transaction"].is_null());
    assert!(json["block"].is_null());

    let json: Value = server.get("/address/nobody").await.json();
    assert_eq!(json["addressData"]["addressBalance"], 0.0);
    assert_eq!(json["addressData"]["addressTransactions"], json!([]));
}

#[tokio::test]
async fn test_broadcast_transaction_assigns_id() {
    let server = test_server();

    let response = server
        .post("/transaction/broadcast")
        .json(&json!({ "amount": 2.5, "sender": "C", "recipient": "D" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["note"], "Transaction created and broadcast successfully.");
    let id = json["transaction"]["transactionId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(json["pendingTransactions"][0]["transactionId"], id.as_str());
}

#[tokio::test]
async fn test_invalid_transaction_rejected() {
    let server = test_server();

    let response = server
        .post("/transaction")
        .json(&json!({ "amount": 1, "sender": "", "recipient": "B" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].is_string());

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(json["pendingTransactions"], json!([]));
}

#[tokio::test]
async fn test_receive_block_checks_linkage() {
    let server = test_server();

    let stray = Block {
        index: 2,
        timestamp: 1,
        transactions: vec![],
        nonce: 0,
        hash: "abc".to_string(),
        previous_block_hash: "not-the-tail".to_string(),
    };
    let response = server
        .post("/receive-new-block")
        .json(&json!({ "newBlock": stray }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["accepted"], false);
    assert!(json["note"].as_str().unwrap().starts_with("New block rejected"));

    let linked = Block {
        previous_block_hash: "0".to_string(),
        ..stray
    };
    let json: Value = server
        .post("/receive-new-block")
        .json(&json!({ "newBlock": linked }))
        .await
        .json();
    assert_eq!(json["accepted"], true);
    assert_eq!(json["note"], "New block received and accepted.");

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(json["chain"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_consensus_without_peers_keeps_chain() {
    let server = test_server();

    let json: Value = server.get("/consensus").await.json();
    assert_eq!(json["replaced"], false);
    assert_eq!(json["note"], "Current chain has not been replaced.");
    assert_eq!(json["chain"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_peer_registration_routes() {
    let server = test_server();

    let response = server
        .post("/register-node")
        .json(&json!({ "newNodeUrl": "http://localhost:3002" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["note"], "New node registered successfully.");

    let json: Value = server
        .post("/register-nodes-bulk")
        .json(&json!({
            "allNetworkNodes": [
                "http://localhost:3001",
                "http://localhost:3002",
                "http://localhost:3003"
            ]
        }))
        .await
        .json();
    assert_eq!(json["note"], "Bulk registration successful.");

    let json: Value = server.get("/blockchain").await.json();
    assert_eq!(
        json["networkNodes"],
        json!(["http://localhost:3002", "http://localhost:3003"])
    );

    let response = server
        .post("/register-and-broadcast-node")
        .json(&json!({ "newNodeUrl": "  " }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_health_and_stats() {
    let blockchain = Arc::new(RwLock::new(Blockchain::new()));
    let network = Arc::new(
        NetworkNode::new("http://localhost:3001", Duration::from_secs(1)).unwrap(),
    );
    let state = Arc::new(RwLock::new(meshledger::node::NodeState::Ready));
    let persistence = Arc::new(meshledger::persistence::InMemoryPersistence::new());
    let node = Arc::new(Node::new_shared(
        blockchain,
        network,
        persistence,
        Some(state.clone()),
    ));
    let server = TestServer::new(build_api_router(node)).unwrap();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["chain_length"], 1);
    assert!(json["timestamp"].is_string());

    *state.write().await = meshledger::node::NodeState::Syncing;
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 503);

    server.get("/mine").await;
    let json: Value = server.get("/stats").await.json();
    assert_eq!(json["blocks_mined"], 1);
    assert!(json["total_requests"].as_u64().unwrap() >= 3);
    assert!(json["failed_requests"].as_u64().unwrap() >= 1);
}
