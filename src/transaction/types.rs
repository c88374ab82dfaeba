/// Transaction types for MeshLedger
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A value transfer between two opaque addresses.
///
/// Field order is part of the block hash preimage: blocks serialize their
/// transactions as `amount, sender, recipient, transactionId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: f64,
    pub sender: String,
    pub recipient: String,
    pub transaction_id: String,
}

impl Transaction {
    /// Build a transaction with a freshly generated id.
    pub fn new(amount: f64, sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Transaction {
            amount,
            sender: sender.into(),
            recipient: recipient.into(),
            transaction_id: new_transaction_id(),
        }
    }

    pub fn involves(&self, address: &str) -> bool {
        self.sender == address || self.recipient == address
    }
}

/// 32 lowercase hex characters, no separators.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Body accepted by the submit-transaction route. Peers forward fully formed
/// transactions; clients may omit the id and get one assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, alias = "id")]
    pub transaction_id: Option<String>,
    pub amount: f64,
    pub sender: String,
    pub recipient: String,
}

impl TransactionRequest {
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            amount: self.amount,
            sender: self.sender,
            recipient: self.recipient,
            transaction_id: self.transaction_id.unwrap_or_else(new_transaction_id),
        }
    }
}

impl From<Transaction> for TransactionRequest {
    fn from(tx: Transaction) -> Self {
        TransactionRequest {
            transaction_id: Some(tx.transaction_id),
            amount: tx.amount,
            sender: tx.sender,
            recipient: tx.recipient,
        }
    }
}

/// Body accepted by the broadcast route: the node creates the transaction itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransactionRequest {
    pub amount: f64,
    pub sender: String,
    pub recipient: String,
}
