//! Transactions: wire types and well-formedness checks

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    #[test]
    fn test_new_transaction_gets_unique_id() {
        let a = Transaction::new(10.0, "alice", "bob");
        let b = Transaction::new(10.0, "alice", "bob");

        assert_eq!(a.transaction_id.len(), 32);
        assert!(a.transaction_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.transaction_id, b.transaction_id);
    }

    #[test]
    fn test_transaction_wire_format() {
        let tx = Transaction {
            amount: 10.0,
            sender: "A".to_string(),
            recipient: "B".to_string(),
            transaction_id: "abc".to_string(),
        };
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(
            json,
            r#"{"amount":10.0,"sender":"A","recipient":"B","transactionId":"abc"}"#
        );
    }

    #[test]
    fn test_request_without_id_is_assigned_one() {
        let req: TransactionRequest =
            serde_json::from_str(r#"{"amount":5,"sender":"A","recipient":"B"}"#).unwrap();
        assert!(req.validate().is_ok());

        let tx = req.into_transaction();
        assert_eq!(tx.amount, 5.0);
        assert_eq!(tx.transaction_id.len(), 32);
    }

    #[test]
    fn test_request_keeps_forwarded_id() {
        let req: TransactionRequest = serde_json::from_str(
            r#"{"amount":5,"sender":"A","recipient":"B","transactionId":"peer-id"}"#,
        )
        .unwrap();
        assert_eq!(req.into_transaction().transaction_id, "peer-id");

        let req: TransactionRequest =
            serde_json::from_str(r#"{"id":"short","amount":1,"sender":"A","recipient":"B"}"#)
                .unwrap();
        assert_eq!(req.transaction_id.as_deref(), Some("short"));
    }

    #[test]
    fn test_empty_sender_rejected() {
        let req = NewTransactionRequest {
            amount: 1.0,
            sender: "  ".to_string(),
            recipient: "B".to_string(),
        };
        match req.validate() {
            Err(ChainError::InvalidTransaction(msg)) => assert!(msg.contains("sender")),
            other => panic!("Expected InvalidTransaction, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        let tx = Transaction::new(f64::NAN, "A", "B");
        assert!(tx.validate().is_err());

        let tx = Transaction::new(f64::INFINITY, "A", "B");
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_negative_amount_is_not_rejected() {
        let tx = Transaction::new(-3.0, "A", "B");
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_oversized_address_rejected() {
        let tx = Transaction::new(1.0, "A".repeat(validation::MAX_FIELD_LENGTH + 1), "B");
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_involves() {
        let tx = Transaction::new(1.0, "A", "B");
        assert!(tx.involves("A"));
        assert!(tx.involves("B"));
        assert!(!tx.involves("C"));
    }
}
