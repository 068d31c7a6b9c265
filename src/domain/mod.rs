//! Domain module
//!
//! Validated money primitives, shared enumerations, and the per-operation
//! context. Everything here is pure and store-free.

pub mod amount;
pub mod context;
pub mod types;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use types::{
    ApplicationStatus, CompoundFrequency, DurationUnit, EmploymentStatus, InvestmentStatus,
    LoanStatus, NotificationKind, OrderStatus, TransactionStatus, TransactionType,
};
