//! fincore Library
//!
//! Wallet ledger and accrual engine: the balance model, the append-only
//! transaction log, the atomic commit units for investments and loans, the
//! pure accrual and eligibility calculators, and the idempotent external
//! payment reconciliation. Re-exported for integration testing and for
//! embedding without the HTTP surface.

pub mod accrual;
pub mod api;
pub mod catalog;
pub mod domain;
pub mod eligibility;
pub mod handlers;
pub mod ledger;
pub mod reconciliation;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, OperationContext};
pub use error::{AppError, AppResult};
pub use ledger::{LedgerError, LedgerStore};
