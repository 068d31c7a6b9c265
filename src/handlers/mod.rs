//! Command Handlers module
//!
//! Each handler executes one named commit unit: a fixed sequence of ledger
//! mutations that all succeed or leave no effect.

mod commands;
mod invest_handler;
mod loan_handler;
mod wallet_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use invest_handler::{FundInvestmentResult, InvestHandler, Investment};
pub use loan_handler::{
    amortize, Loan, LoanApplication, LoanApplicationResult, LoanDecisionResult, LoanHandler,
    LoanPaymentResult,
};
pub use wallet_handler::WalletHandler;
