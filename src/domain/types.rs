//! Domain enumerations
//!
//! Closed vocabularies shared by the ledger, the catalog, and the handlers.
//! All of these are stored as snake_case strings in PostgreSQL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Investment,
    LoanDisbursement,
    LoanPayment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Investment => "investment",
            TransactionType::LoanDisbursement => "loan_disbursement",
            TransactionType::LoanPayment => "loan_payment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "investment" => Ok(TransactionType::Investment),
            "loan_disbursement" => Ok(TransactionType::LoanDisbursement),
            "loan_payment" => Ok(TransactionType::LoanPayment),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Ledger transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TransactionStatus::Pending,
            "failed" => TransactionStatus::Failed,
            _ => TransactionStatus::Completed,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Investment plan duration unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Days => "days",
            DurationUnit::Weeks => "weeks",
            DurationUnit::Months => "months",
            DurationUnit::Years => "years",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "days" => Ok(DurationUnit::Days),
            "weeks" => Ok(DurationUnit::Weeks),
            "months" => Ok(DurationUnit::Months),
            "years" => Ok(DurationUnit::Years),
            other => Err(format!("unknown duration unit: {}", other)),
        }
    }
}

/// Compounding frequency of an investment plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl CompoundFrequency {
    /// Compounding periods per year
    pub fn periods_per_year(&self) -> u32 {
        match self {
            CompoundFrequency::Daily => 365,
            CompoundFrequency::Weekly => 52,
            CompoundFrequency::Monthly => 12,
            CompoundFrequency::Quarterly => 4,
            CompoundFrequency::Yearly => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundFrequency::Daily => "daily",
            CompoundFrequency::Weekly => "weekly",
            CompoundFrequency::Monthly => "monthly",
            CompoundFrequency::Quarterly => "quarterly",
            CompoundFrequency::Yearly => "yearly",
        }
    }
}

impl Default for CompoundFrequency {
    /// Plans created without a frequency compound monthly.
    fn default() -> Self {
        CompoundFrequency::Monthly
    }
}

impl fmt::Display for CompoundFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompoundFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(CompoundFrequency::Daily),
            "weekly" => Ok(CompoundFrequency::Weekly),
            "monthly" => Ok(CompoundFrequency::Monthly),
            "quarterly" => Ok(CompoundFrequency::Quarterly),
            "yearly" => Ok(CompoundFrequency::Yearly),
            other => Err(format!("unknown compound frequency: {}", other)),
        }
    }
}

/// Investment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Pending,
    Active,
    Matured,
    Cancelled,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Pending => "pending",
            InvestmentStatus::Active => "active",
            InvestmentStatus::Matured => "matured",
            InvestmentStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for InvestmentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => InvestmentStatus::Active,
            "matured" => InvestmentStatus::Matured,
            "cancelled" => InvestmentStatus::Cancelled,
            _ => InvestmentStatus::Pending,
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Applicant employment status used by the eligibility scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Unemployed,
    Retired,
    Student,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "employed",
            EmploymentStatus::SelfEmployed => "self_employed",
            EmploymentStatus::Unemployed => "unemployed",
            EmploymentStatus::Retired => "retired",
            EmploymentStatus::Student => "student",
        }
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employed" => Ok(EmploymentStatus::Employed),
            "self_employed" => Ok(EmploymentStatus::SelfEmployed),
            "unemployed" => Ok(EmploymentStatus::Unemployed),
            "retired" => Ok(EmploymentStatus::Retired),
            "student" => Ok(EmploymentStatus::Student),
            other => Err(format!("unknown employment status: {}", other)),
        }
    }
}

/// Loan application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl From<String> for ApplicationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "approved" => ApplicationStatus::Approved,
            "rejected" => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Pending,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loan status after approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Closed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Closed => "closed",
        }
    }
}

impl From<String> for LoanStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "closed" => LoanStatus::Closed,
            _ => LoanStatus::Active,
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Crypto deposit order status
///
/// `pending` transitions exactly once into one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl OrderStatus {
    /// Terminal states never transition again; replayed payment events
    /// against them are no-ops.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Expired => "expired",
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "completed" => OrderStatus::Completed,
            "failed" => OrderStatus::Failed,
            "expired" => OrderStatus::Expired,
            _ => OrderStatus::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Transaction,
    Investment,
    Loan,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Transaction => "transaction",
            NotificationKind::Investment => "investment",
            NotificationKind::Loan => "loan",
            NotificationKind::System => "system",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip() {
        for ty in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::Investment,
            TransactionType::LoanDisbursement,
            TransactionType::LoanPayment,
        ] {
            let parsed: TransactionType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn test_transaction_type_unknown_rejected() {
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_compound_frequency_periods() {
        assert_eq!(CompoundFrequency::Daily.periods_per_year(), 365);
        assert_eq!(CompoundFrequency::Weekly.periods_per_year(), 52);
        assert_eq!(CompoundFrequency::Monthly.periods_per_year(), 12);
        assert_eq!(CompoundFrequency::Quarterly.periods_per_year(), 4);
        assert_eq!(CompoundFrequency::Yearly.periods_per_year(), 1);
    }

    #[test]
    fn test_compound_frequency_default_is_monthly() {
        assert_eq!(CompoundFrequency::default(), CompoundFrequency::Monthly);
    }

    #[test]
    fn test_order_status_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn test_order_status_from_string() {
        assert_eq!(OrderStatus::from("completed".to_string()), OrderStatus::Completed);
        assert_eq!(OrderStatus::from("garbage".to_string()), OrderStatus::Pending);
    }

    #[test]
    fn test_employment_status_serde() {
        let json = serde_json::to_string(&EmploymentStatus::SelfEmployed).unwrap();
        assert_eq!(json, r#""self_employed""#);

        let back: EmploymentStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EmploymentStatus::SelfEmployed);
    }
}
