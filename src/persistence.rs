//! Database persistence layer for MeshLedger

use crate::blockchain::{Block, Blockchain, LedgerSnapshot, ReceivePolicy};
use crate::error::ChainError;
use crate::transaction::Transaction;
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// Abstraction for persistence backends. A save replaces the stored ledger
/// wholesale, since consensus may swap the entire chain.
pub trait Persistence: Send + Sync {
    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), ChainError>;

    /// `None` when nothing has been stored yet.
    fn load_snapshot(&self) -> Result<Option<LedgerSnapshot>, ChainError>;

    /// Restore the stored ledger, or a genesis-only one when the store is empty.
    /// A stored chain that fails validation is an error.
    fn load_blockchain(&self, policy: ReceivePolicy) -> Result<Blockchain, ChainError> {
        match self.load_snapshot()? {
            Some(snapshot) => Blockchain::from_snapshot(snapshot, policy),
            None => Ok(Blockchain::with_policy(policy)),
        }
    }
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                idx INTEGER PRIMARY KEY,
                hash TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                nonce INTEGER NOT NULL,
                transactions TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending (
                position INTEGER PRIMARY KEY,
                transaction_data TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to create pending table: {}", e))
        })?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    /// Atomically replaces the stored chain and pending pool.
    pub fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), ChainError> {
        let conn_guard = self.lock()?;
        let tx = conn_guard.unchecked_transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        tx.execute("DELETE FROM blocks", [])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to clear blocks: {}", e)))?;
        tx.execute("DELETE FROM pending", [])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to clear pending: {}", e)))?;

        for block in &snapshot.chain {
            let transactions_json = serde_json::to_string(&block.transactions).map_err(|e| {
                ChainError::DatabaseError(format!("Failed to serialize transactions: {}", e))
            })?;
            tx.execute(
                "INSERT INTO blocks (idx, hash, previous_hash, timestamp, nonce, transactions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    block.index as i64,
                    block.hash,
                    block.previous_block_hash,
                    block.timestamp as i64,
                    block.nonce as i64,
                    transactions_json,
                ],
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to save block: {}", e)))?;
        }

        for (position, pending) in snapshot.pending_transactions.iter().enumerate() {
            let transaction_json = serde_json::to_string(pending).map_err(|e| {
                ChainError::DatabaseError(format!("Failed to serialize transaction: {}", e))
            })?;
            tx.execute(
                "INSERT INTO pending (position, transaction_data) VALUES (?1, ?2)",
                params![position as i64, transaction_json],
            )
            .map_err(|e| {
                ChainError::DatabaseError(format!("Failed to save pending transaction: {}", e))
            })?;
        }

        tx.commit().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<Option<LedgerSnapshot>, ChainError> {
        let conn_guard = self.lock()?;

        let mut stmt = conn_guard
            .prepare(
                "SELECT idx, hash, previous_hash, timestamp, nonce, transactions
                 FROM blocks ORDER BY idx ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let blocks_iter = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let timestamp: i64 = row.get(3)?;
                let nonce: i64 = row.get(4)?;
                let transactions_json: String = row.get(5)?;
                Ok(RawBlock {
                    index: index as u64,
                    hash: row.get(1)?,
                    previous_block_hash: row.get(2)?,
                    timestamp: timestamp as u64,
                    nonce: nonce as u64,
                    transactions_json,
                })
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut chain = Vec::new();
        for raw in blocks_iter {
            let raw = raw
                .map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;
            chain.push(raw.into_block()?);
        }

        if chain.is_empty() {
            return Ok(None);
        }

        let mut stmt = conn_guard
            .prepare("SELECT transaction_data FROM pending ORDER BY position ASC")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;
        let pending_iter = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query pending: {}", e)))?;

        let mut pending_transactions = Vec::new();
        for row in pending_iter {
            let json = row.map_err(|e| {
                ChainError::DatabaseError(format!("Failed to load pending transaction: {}", e))
            })?;
            let tx: Transaction = serde_json::from_str(&json).map_err(|e| {
                ChainError::DatabaseError(format!("Failed to deserialize transaction: {}", e))
            })?;
            pending_transactions.push(tx);
        }

        Ok(Some(LedgerSnapshot {
            chain,
            pending_transactions,
        }))
    }
}

struct RawBlock {
    index: u64,
    hash: String,
    previous_block_hash: String,
    timestamp: u64,
    nonce: u64,
    transactions_json: String,
}

impl RawBlock {
    fn into_block(self) -> Result<Block, ChainError> {
        let transactions: Vec<Transaction> = serde_json::from_str(&self.transactions_json)
            .map_err(|e| {
                ChainError::DatabaseError(format!("Failed to deserialize transactions: {}", e))
            })?;
        Ok(Block {
            index: self.index,
            timestamp: self.timestamp,
            transactions,
            nonce: self.nonce,
            hash: self.hash,
            previous_block_hash: self.previous_block_hash,
        })
    }
}

impl Persistence for Database {
    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), ChainError> {
        Database::save_snapshot(self, snapshot)
    }

    fn load_snapshot(&self) -> Result<Option<LedgerSnapshot>, ChainError> {
        Database::load_snapshot(self)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    snapshot: std::sync::Arc<Mutex<Option<LedgerSnapshot>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_snapshot(&self, snapshot: &LedgerSnapshot) -> Result<(), ChainError> {
        let mut stored = self
            .snapshot
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        *stored = Some(snapshot.clone());
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<LedgerSnapshot>, ChainError> {
        let stored = self
            .snapshot
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(stored.clone())
    }
}
