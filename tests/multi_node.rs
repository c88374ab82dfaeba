//! Several nodes on loopback talking to each other over real HTTP.

use meshledger::api::{build_api_router, Node};
use meshledger::blockchain::Blockchain;
use meshledger::network::NetworkNode;
use meshledger::transaction::Transaction;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct TestNode {
    url: String,
    node: Arc<Node>,
}

async fn spawn_node() -> TestNode {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let network = NetworkNode::new(url.clone(), Duration::from_secs(5)).unwrap();
    let node = Arc::new(Node::new(Blockchain::new(), network));

    let app = build_api_router(node.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestNode { url, node }
}

async fn get_json(url: String) -> Value {
    reqwest::get(url).await.unwrap().json().await.unwrap()
}

async fn post_json(url: String, body: Value) -> Value {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_register_and_broadcast_joins_everyone() {
    let a = spawn_node().await;
    let b = spawn_node().await;
    let c = spawn_node().await;
    a.node.network.register_peer(&b.url).await;

    let json = post_json(
        format!("{}/register-and-broadcast-node", a.url),
        json!({ "newNodeUrl": c.url }),
    )
    .await;
    assert_eq!(json["note"], "New node registered with network successfully.");

    assert_eq!(a.node.network.list_peers().await, vec![b.url.clone(), c.url.clone()]);
    assert_eq!(b.node.network.list_peers().await, vec![c.url.clone()]);
    assert_eq!(c.node.network.list_peers().await, vec![b.url.clone(), a.url.clone()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_transaction_and_block_propagate() {
    let a = spawn_node().await;
    let b = spawn_node().await;
    a.node.network.register_peer(&b.url).await;
    b.node.network.register_peer(&a.url).await;

    let json = post_json(
        format!("{}/transaction/broadcast", a.url),
        json!({ "amount": 10, "sender": "A", "recipient": "B" }),
    )
    .await;
    let id = json["transaction"]["transactionId"].as_str().unwrap().to_string();

    let pending = b.node.blockchain.read().await.mempool().get_all_transactions();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].transaction_id, id);

    let json = get_json(format!("{}/mine", a.url)).await;
    assert_eq!(json["block"]["index"], 2);

    let a_chain = a.node.blockchain.read().await.snapshot();
    let b_chain = b.node.blockchain.read().await.snapshot();
    assert_eq!(a_chain, b_chain);
    assert!(b_chain.pending_transactions.is_empty());

    let json = get_json(format!("{}/address/B", b.url)).await;
    assert_eq!(json["addressData"]["addressBalance"], 10.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fork_resolves_through_consensus_route() {
    let a = spawn_node().await;
    let b = spawn_node().await;

    // Mine apart so the two chains diverge at index 2.
    a.node
        .blockchain
        .write()
        .await
        .add_pending_transaction(Transaction::new(1.0, "A", "X"));
    get_json(format!("{}/mine", a.url)).await;
    b.node
        .blockchain
        .write()
        .await
        .add_pending_transaction(Transaction::new(2.0, "B", "Y"));
    let json = get_json(format!("{}/mine", b.url)).await;
    let fork_block = json["block"].clone();

    let json = post_json(
        format!("{}/receive-new-block", a.url),
        json!({ "newBlock": fork_block }),
    )
    .await;
    assert_eq!(json["accepted"], false);

    get_json(format!("{}/mine", a.url)).await;

    // Unreachable peers are skipped rather than failing the round.
    b.node.network.register_peer("http://127.0.0.1:9").await;
    b.node.network.register_peer(&a.url).await;

    let json = get_json(format!("{}/consensus", b.url)).await;
    assert_eq!(json["replaced"], true);
    assert_eq!(json["note"], "This chain has been replaced.");
    assert_eq!(json["chain"].as_array().unwrap().len(), 3);

    let a_blocks = a.node.blockchain.read().await.blocks().to_vec();
    let b_blocks = b.node.blockchain.read().await.blocks().to_vec();
    assert_eq!(a_blocks, b_blocks);

    let json = get_json(format!("{}/consensus", b.url)).await;
    assert_eq!(json["replaced"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mining_survives_caller_disconnect() {
    let a = spawn_node().await;
    a.node
        .blockchain
        .write()
        .await
        .add_pending_transaction(Transaction::new(4.0, "A", "B"));

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(5))
        .build()
        .unwrap();
    // The client gives up long before the search can finish.
    let _ = impatient.get(format!("{}/mine", a.url)).send().await;

    let mut committed = false;
    for _ in 0..600 {
        if a.node.blockchain.read().await.len() == 2 {
            committed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(committed, "mined block was never committed");

    let chain = a.node.blockchain.read().await;
    assert!(chain.mempool().is_empty());
    assert_eq!(chain.last_block().transactions.len(), 1);
    assert_eq!(a.node.blocks_mined(), 1);
}
