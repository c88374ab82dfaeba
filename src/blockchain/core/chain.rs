use crate::blockchain::core::validation::{validate_block_proof, validate_stored_chain};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner::{mine_candidate, ProofOfWork};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Previous-hash sentinel and stored hash of the genesis block.
pub const GENESIS_HASH: &str = "0";
pub const GENESIS_NONCE: u64 = 100;
pub const GENESIS_INDEX: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
    pub previous_block_hash: String,
}

impl Block {
    pub fn genesis() -> Self {
        Block {
            index: GENESIS_INDEX,
            timestamp: 0,
            transactions: Vec::new(),
            nonce: GENESIS_NONCE,
            hash: GENESIS_HASH.to_string(),
            previous_block_hash: GENESIS_HASH.to_string(),
        }
    }

    /// The hashed part of the block: `{transactions, index}`.
    pub fn data(&self) -> BlockData {
        BlockData {
            transactions: self.transactions.clone(),
            index: self.index,
        }
    }
}

/// Content covered by the block hash besides the previous hash and nonce.
/// Field order is the canonical JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub transactions: Vec<Transaction>,
    pub index: u64,
}

/// Everything the miner needs, detached from the ledger so the search can run
/// without holding the ledger lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub previous_block_hash: String,
    pub data: BlockData,
}

/// Result of offering a peer-mined block to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Accepted,
    Rejected(String),
}

impl BlockOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, BlockOutcome::Accepted)
    }
}

/// How much of an externally mined block is checked before it is appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceivePolicy {
    /// Linkage and index continuity only.
    #[default]
    TrustLinkage,
    /// Linkage, index continuity, and recomputed hash plus difficulty.
    VerifyProof,
}

/// Full ledger state as exchanged between nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub pending_transactions: Vec<Transaction>,
}

/// The ledger store: chain plus pending pool. The chain always starts with the
/// genesis block and is never empty.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    mempool: Mempool,
    receive_policy: ReceivePolicy,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// A fresh genesis-only ledger.
    pub fn new() -> Self {
        Self::with_policy(ReceivePolicy::default())
    }

    pub fn with_policy(receive_policy: ReceivePolicy) -> Self {
        Blockchain {
            blocks: vec![Block::genesis()],
            mempool: Mempool::new(),
            receive_policy,
        }
    }

    /// Restore a ledger from a snapshot. The chain must pass the same level of
    /// checking `receive_policy` applies to incoming blocks.
    pub fn from_snapshot(
        snapshot: LedgerSnapshot,
        receive_policy: ReceivePolicy,
    ) -> Result<Self, ChainError> {
        validate_stored_chain(&snapshot.chain, receive_policy)?;
        Ok(Blockchain {
            blocks: snapshot.chain,
            mempool: snapshot.pending_transactions.into(),
            receive_policy,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn receive_policy(&self) -> ReceivePolicy {
        self.receive_policy
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_block(&self) -> &Block {
        // Non-empty by construction: every constructor seeds or validates genesis.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Queue a transaction and return the index of the block it will most
    /// likely land in.
    pub fn add_pending_transaction(&mut self, tx: Transaction) -> u64 {
        debug!(transaction_id = %tx.transaction_id, "mempool.add");
        self.mempool.add_transaction(tx);
        self.last_block().index + 1
    }

    /// Build a transaction with a fresh id. It is not added to the pool.
    pub fn create_transaction(
        &self,
        amount: f64,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Transaction {
        Transaction::new(amount, sender, recipient)
    }

    /// Snapshot the tail hash and the pending pool as the next block's content.
    pub fn prepare_candidate(&self) -> Candidate {
        let last = self.last_block();
        Candidate {
            previous_block_hash: last.hash.clone(),
            data: BlockData {
                transactions: self.mempool.get_all_transactions(),
                index: last.index + 1,
            },
        }
    }

    /// Append a block mined from `candidate`, provided the tail has not moved
    /// since the candidate was prepared. Clears the pending pool.
    pub fn commit_mined(
        &mut self,
        candidate: Candidate,
        proof: ProofOfWork,
    ) -> Result<Block, ChainError> {
        let last = self.last_block();
        if candidate.previous_block_hash != last.hash || candidate.data.index != last.index + 1 {
            return Err(ChainError::StaleCandidate {
                expected: candidate.previous_block_hash,
                actual: last.hash.clone(),
            });
        }

        let block = Block {
            index: candidate.data.index,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            transactions: candidate.data.transactions,
            nonce: proof.nonce,
            hash: proof.hash,
            previous_block_hash: candidate.previous_block_hash,
        };

        self.blocks.push(block.clone());
        self.mempool.clear();
        info!(index = block.index, hash = %block.hash, nonce = block.nonce, "block.mined");
        Ok(block)
    }

    /// Mine the pending pool into a new block and append it.
    pub fn mine_next_block(&mut self) -> Result<Block, ChainError> {
        let candidate = self.prepare_candidate();
        let proof = mine_candidate(&candidate)?;
        self.commit_mined(candidate, proof)
    }

    /// Append a block mined elsewhere if it extends the current tail.
    pub fn receive_external_block(&mut self, block: Block) -> BlockOutcome {
        let last = self.last_block();

        if block.previous_block_hash != last.hash {
            let reason = format!(
                "previous hash {} does not match tail hash {}",
                block.previous_block_hash, last.hash
            );
            info!(index = block.index, %reason, "block.rejected");
            return BlockOutcome::Rejected(reason);
        }

        if block.index != last.index + 1 {
            let reason = format!("expected index {}, got {}", last.index + 1, block.index);
            info!(index = block.index, %reason, "block.rejected");
            return BlockOutcome::Rejected(reason);
        }

        if self.receive_policy == ReceivePolicy::VerifyProof {
            if let Err(e) = validate_block_proof(&block) {
                let reason = e.to_string();
                info!(index = block.index, %reason, "block.rejected");
                return BlockOutcome::Rejected(reason);
            }
        }

        info!(index = block.index, hash = %block.hash, "block.accepted");
        self.blocks.push(block);
        self.mempool.clear();
        BlockOutcome::Accepted
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            chain: self.blocks.clone(),
            pending_transactions: self.mempool.get_all_transactions(),
        }
    }

    /// Move the ledger state out, leaving a genesis-only ledger behind.
    pub(crate) fn take_snapshot(&mut self) -> LedgerSnapshot {
        LedgerSnapshot {
            chain: std::mem::replace(&mut self.blocks, vec![Block::genesis()]),
            pending_transactions: std::mem::take(&mut self.mempool).into(),
        }
    }

    /// Install a snapshot wholesale. Callers must have validated the chain.
    pub(crate) fn install_snapshot(&mut self, snapshot: LedgerSnapshot) {
        debug_assert!(!snapshot.chain.is_empty());
        self.blocks = snapshot.chain;
        self.mempool = snapshot.pending_transactions.into();
    }
}
