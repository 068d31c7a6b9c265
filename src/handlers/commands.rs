//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts travel
//! as strings so precision is preserved until the handler validates them
//! into `Amount`s.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::EmploymentStatus;
use crate::ledger::{TransactionRecord, Wallet};

/// Direction of a wallet adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Deposit,
    Withdrawal,
}

impl AdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Deposit => "deposit",
            AdjustmentType::Withdrawal => "withdrawal",
        }
    }
}

/// Command to deposit into or withdraw from a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletAdjustCommand {
    pub user_id: Uuid,
    pub adjust_type: AdjustmentType,
    /// Amount as string for precise decimal handling
    pub amount: String,
    /// Optional description for the ledger entry
    pub description: Option<String>,
}

impl WalletAdjustCommand {
    pub fn new(user_id: Uuid, adjust_type: AdjustmentType, amount: String) -> Self {
        Self {
            user_id,
            adjust_type,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}

/// Command to fund an investment from the wallet balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundInvestmentCommand {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// Principal as string for precise decimal handling
    pub amount: String,
}

impl FundInvestmentCommand {
    pub fn new(user_id: Uuid, plan_id: Uuid, amount: String) -> Self {
        Self {
            user_id,
            plan_id,
            amount,
        }
    }
}

/// Command to submit a loan application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplicationCommand {
    pub user_id: Uuid,
    pub amount: String,
    pub purpose: String,
    pub employment_status: Option<EmploymentStatus>,
    pub monthly_income: Option<Decimal>,
}

impl LoanApplicationCommand {
    pub fn new(user_id: Uuid, amount: String, purpose: String) -> Self {
        Self {
            user_id,
            amount,
            purpose,
            employment_status: None,
            monthly_income: None,
        }
    }

    pub fn with_employment(mut self, status: EmploymentStatus) -> Self {
        self.employment_status = Some(status);
        self
    }

    pub fn with_monthly_income(mut self, income: Decimal) -> Self {
        self.monthly_income = Some(income);
        self
    }
}

/// Decision on a pending loan application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoanDecision {
    /// Approve with the terms the loan will carry
    Approve {
        interest_rate: Decimal,
        term_months: u32,
    },
    /// Reject with a reason shown to the applicant
    Reject { reason: String },
}

/// Command to decide a pending loan application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanDecisionCommand {
    pub application_id: Uuid,
    pub decision: LoanDecision,
}

/// Command to make a payment against an active loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPaymentCommand {
    pub loan_id: Uuid,
    pub amount: String,
}

/// Result of a wallet adjustment
#[derive(Debug, Clone, Serialize)]
pub struct WalletAdjustResult {
    pub wallet: Wallet,
    pub transaction: TransactionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wallet_adjust_command() {
        let cmd = WalletAdjustCommand::new(
            Uuid::new_v4(),
            AdjustmentType::Deposit,
            "100.00".to_string(),
        )
        .with_description("Initial top-up".to_string());

        assert_eq!(cmd.adjust_type, AdjustmentType::Deposit);
        assert_eq!(cmd.amount, "100.00");
        assert_eq!(cmd.description, Some("Initial top-up".to_string()));
    }

    #[test]
    fn test_fund_investment_command() {
        let user = Uuid::new_v4();
        let plan = Uuid::new_v4();
        let cmd = FundInvestmentCommand::new(user, plan, "250.50".to_string());

        assert_eq!(cmd.user_id, user);
        assert_eq!(cmd.plan_id, plan);
        assert_eq!(cmd.amount, "250.50");
    }

    #[test]
    fn test_loan_application_command_builder() {
        let cmd = LoanApplicationCommand::new(
            Uuid::new_v4(),
            "5000".to_string(),
            "Home renovation".to_string(),
        )
        .with_employment(EmploymentStatus::Employed)
        .with_monthly_income(dec!(3000));

        assert_eq!(cmd.employment_status, Some(EmploymentStatus::Employed));
        assert_eq!(cmd.monthly_income, Some(dec!(3000)));
    }

    #[test]
    fn test_adjustment_type_as_str() {
        assert_eq!(AdjustmentType::Deposit.as_str(), "deposit");
        assert_eq!(AdjustmentType::Withdrawal.as_str(), "withdrawal");
    }
}
