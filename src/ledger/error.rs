//! Ledger Errors
//!
//! Error types for ledger store operations.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::AmountError;

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A debit would take the available balance below zero
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Wallet row does not exist and lazy creation was disabled
    #[error("Wallet not found for user {0}")]
    WalletNotFound(Uuid),

    /// Invalid monetary value
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// A stored balance violates the non-negative invariant
    #[error("Balance invariant violated: {0}")]
    BalanceInvariant(String),

    /// A stored row cannot be decoded into its domain type
    #[error("Corrupt ledger row: {0}")]
    CorruptRow(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Whether this error was caused by the caller (as opposed to the store)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::WalletNotFound(_)
                | LedgerError::InvalidAmount(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_display() {
        let err = LedgerError::InsufficientFunds {
            required: dec!(100),
            available: dec!(40),
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("40"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invariant_violation_is_not_client_error() {
        let err = LedgerError::BalanceInvariant("negative balance".to_string());
        assert!(!err.is_client_error());
    }
}
