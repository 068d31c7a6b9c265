//! Reconciliation module
//!
//! Crypto deposit intents and the idempotent application of external
//! payment-confirmation events to the ledger.

mod handler;
mod processor;

pub use handler::{
    verify_webhook_signature, CreateDepositCommand, CryptoOrder, PaymentEventStatus,
    ReconciliationHandler, ReconciliationOutcome,
};
pub use processor::{PaymentProcessor, ProcessorQuote};
