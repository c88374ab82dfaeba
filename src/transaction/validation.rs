//! Well-formedness checks applied by the transport before a transaction
//! reaches the pending pool. The ledger itself does not re-check them.
use crate::error::ChainError;
use crate::transaction::types::{NewTransactionRequest, Transaction, TransactionRequest};

/// Upper bound on address and id length to keep request bodies sane
pub const MAX_FIELD_LENGTH: usize = 256;

fn check_address(field: &str, value: &str) -> Result<(), ChainError> {
    if value.trim().is_empty() {
        return Err(ChainError::InvalidTransaction(format!("{} must not be empty", field)));
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(ChainError::InvalidTransaction(format!(
            "{} too long: {} bytes (max: {})",
            field,
            value.len(),
            MAX_FIELD_LENGTH
        )));
    }
    Ok(())
}

fn check_amount(amount: f64) -> Result<(), ChainError> {
    if !amount.is_finite() {
        return Err(ChainError::InvalidTransaction(format!(
            "amount must be a finite number, got {}",
            amount
        )));
    }
    Ok(())
}

impl Transaction {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_amount(self.amount)?;
        check_address("sender", &self.sender)?;
        check_address("recipient", &self.recipient)?;
        check_address("transactionId", &self.transaction_id)
    }
}

impl TransactionRequest {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_amount(self.amount)?;
        check_address("sender", &self.sender)?;
        check_address("recipient", &self.recipient)?;
        if let Some(id) = &self.transaction_id {
            check_address("transactionId", id)?;
        }
        Ok(())
    }
}

impl NewTransactionRequest {
    pub fn validate(&self) -> Result<(), ChainError> {
        check_amount(self.amount)?;
        check_address("sender", &self.sender)?;
        check_address("recipient", &self.recipient)
    }
}
