//! Pending transaction pool

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Insertion-ordered transactions waiting for the next block.
///
/// Serializes as a plain JSON array so it can travel inside ledger snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get_all_transactions(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Drop everything. Transactions that did not make it into the appended
    /// block are not requeued.
    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}

impl From<Vec<Transaction>> for Mempool {
    fn from(transactions: Vec<Transaction>) -> Self {
        Mempool { transactions }
    }
}

impl From<Mempool> for Vec<Transaction> {
    fn from(pool: Mempool) -> Self {
        pool.transactions
    }
}
