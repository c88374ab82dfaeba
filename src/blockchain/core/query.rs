//! Read-only views over the committed chain. Pending transactions never show
//! up here.

use crate::blockchain::core::chain::{Block, Blockchain};
use crate::transaction::Transaction;
use serde::Serialize;

/// Aggregate of every committed transaction touching one address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressData {
    pub address_transactions: Vec<Transaction>,
    pub sent_total: f64,
    pub received_total: f64,
    pub address_balance: f64,
}

impl Blockchain {
    pub fn get_block(&self, hash: &str) -> Option<&Block> {
        self.blocks().iter().find(|block| block.hash == hash)
    }

    /// The committed transaction with this id and the block holding it.
    pub fn get_transaction(&self, transaction_id: &str) -> Option<(&Transaction, &Block)> {
        self.blocks().iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|tx| tx.transaction_id == transaction_id)
                .map(|tx| (tx, block))
        })
    }

    pub fn get_address_data(&self, address: &str) -> AddressData {
        let mut address_transactions = Vec::new();
        let mut sent_total = 0.0;
        let mut received_total = 0.0;

        for tx in self.blocks().iter().flat_map(|block| block.transactions.iter()) {
            if !tx.involves(address) {
                continue;
            }
            if tx.sender == address {
                sent_total += tx.amount;
            }
            if tx.recipient == address {
                received_total += tx.amount;
            }
            address_transactions.push(tx.clone());
        }

        AddressData {
            address_transactions,
            sent_total,
            received_total,
            address_balance: received_total - sent_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::core::chain::GENESIS_HASH;

    fn chain_with(transactions: Vec<Vec<Transaction>>) -> Blockchain {
        let mut chain = Blockchain::new();
        for batch in transactions {
            for tx in batch {
                chain.add_pending_transaction(tx);
            }
            chain.mine_next_block().unwrap();
        }
        chain
    }

    #[test]
    fn test_get_block_by_hash() {
        let chain = chain_with(vec![vec![]]);
        let mined = chain.last_block().clone();

        assert_eq!(chain.get_block(&mined.hash), Some(&mined));
        assert_eq!(chain.get_block(GENESIS_HASH).map(|b| b.index), Some(1));
        assert!(chain.get_block("no-such-hash").is_none());
    }

    #[test]
    fn test_get_transaction_returns_owning_block() {
        let tx = Transaction::new(3.0, "A", "B");
        let chain = chain_with(vec![vec![tx.clone()]]);

        let (found, block) = chain.get_transaction(&tx.transaction_id).unwrap();
        assert_eq!(found, &tx);
        assert_eq!(block.index, 2);
        assert!(chain.get_transaction("missing").is_none());
    }

    #[test]
    fn test_pending_transaction_is_not_found() {
        let mut chain = Blockchain::new();
        let tx = Transaction::new(3.0, "A", "B");
        chain.add_pending_transaction(tx.clone());
        assert!(chain.get_transaction(&tx.transaction_id).is_none());
    }

    #[test]
    fn test_address_aggregate_excludes_pending() {
        let mut chain = chain_with(vec![
            vec![Transaction::new(10.0, "A", "B")],
            vec![Transaction::new(4.0, "B", "C"), Transaction::new(1.5, "A", "B")],
        ]);
        chain.add_pending_transaction(Transaction::new(100.0, "C", "B"));

        let b = chain.get_address_data("B");
        assert_eq!(b.received_total, 11.5);
        assert_eq!(b.sent_total, 4.0);
        assert_eq!(b.address_balance, b.received_total - b.sent_total);
        assert_eq!(b.address_transactions.len(), 3);

        let a = chain.get_address_data("A");
        assert_eq!(a.address_balance, -11.5);

        let nobody = chain.get_address_data("Z");
        assert!(nobody.address_transactions.is_empty());
        assert_eq!(nobody.address_balance, 0.0);
    }

    #[test]
    fn test_self_transfer_nets_to_zero() {
        let chain = chain_with(vec![vec![Transaction::new(5.0, "A", "A")]]);
        let a = chain.get_address_data("A");
        assert_eq!(a.sent_total, 5.0);
        assert_eq!(a.received_total, 5.0);
        assert_eq!(a.address_balance, 0.0);
        assert_eq!(a.address_transactions.len(), 1);
    }
}
