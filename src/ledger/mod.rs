//! Ledger module
//!
//! Durable wallets and the append-only transaction log that is the source
//! of truth for balances.

mod error;
mod store;

pub use error::LedgerError;
pub use store::{
    BalanceEffect, LedgerEntry, LedgerStore, Notification, TransactionRecord, Wallet,
    SETTLEMENT_CURRENCY,
};
