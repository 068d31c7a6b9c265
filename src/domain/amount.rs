//! Monetary domain primitives
//!
//! `Amount` is a validated, strictly-positive monetary value; `Balance` is a
//! zero-or-positive wallet balance. Both are validated at construction time
//! so invalid money values cannot circulate through the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound for any single monetary value (settlement currency units)
const MAX_VALUE: &str = "1000000000000";

/// Maximum decimal places stored by the ledger (NUMERIC(20,8))
const MAX_SCALE: u32 = 8;

/// A validated monetary amount.
///
/// # Invariants
/// - Strictly positive (> 0)
/// - At most 8 decimal places
/// - At most `MAX_VALUE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

/// Errors raised when constructing an `Amount` or `Balance`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MAX_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value ({MAX_VALUE})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new `Amount` with validation.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        let max = Decimal::from_str(MAX_VALUE).expect("Invalid MAX_VALUE constant");
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    /// Create an `Amount` from a whole number of currency units.
    pub fn from_integer(value: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(value))
    }

    /// The underlying decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Signed ledger representation of this amount: positive for a credit,
    /// negative for a debit.
    pub fn signed(&self, is_credit: bool) -> Decimal {
        if is_credit {
            self.0
        } else {
            -self.0
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s).map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_str(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format!("{:.8}", amount.0)
    }
}

/// A wallet balance. Unlike `Amount`, a `Balance` may be zero but never
/// negative; a debit that would go below zero is rejected at this level
/// before any row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a balance (zero or positive).
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let max = Decimal::from_str(MAX_VALUE).expect("Invalid MAX_VALUE constant");
        if value > max {
            return Err(AmountError::Overflow);
        }

        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether this balance can cover a debit of `amount`.
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Balance after a credit.
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Balance after a debit. Fails if the result would be negative.
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(Decimal::new(100, 0));
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(100, 0));
    }

    #[test]
    fn test_amount_zero_rejected() {
        let amount = Amount::new(Decimal::ZERO);
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let amount = Amount::new(Decimal::new(-100, 0));
        assert!(matches!(amount, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_amount_too_many_decimals() {
        // 0.123456789 has 9 decimal places
        let amount = Amount::new(Decimal::new(123456789, 9));
        assert!(matches!(amount, Err(AmountError::TooManyDecimals(9))));
    }

    #[test]
    fn test_amount_max_decimals_ok() {
        // 0.12345678 has 8 decimal places
        let amount = Amount::new(Decimal::new(12345678, 8));
        assert!(amount.is_ok());
    }

    #[test]
    fn test_amount_overflow() {
        let value = Decimal::from_str("1000000000001").unwrap();
        assert!(matches!(Amount::new(value), Err(AmountError::Overflow)));
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Result<Amount, _> = "123.456".parse();
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), Decimal::new(123456, 3));
    }

    #[test]
    fn test_amount_signed() {
        let amount = Amount::from_integer(200).unwrap();
        assert_eq!(amount.signed(true), Decimal::new(200, 0));
        assert_eq!(amount.signed(false), Decimal::new(-200, 0));
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::zero();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        let balance = balance.credit(&amount).unwrap();
        assert_eq!(balance.value(), Decimal::new(100, 0));

        let withdraw = Amount::new(Decimal::new(30, 0)).unwrap();
        let balance = balance.debit(&withdraw).unwrap();
        assert_eq!(balance.value(), Decimal::new(70, 0));
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(Decimal::new(50, 0)).unwrap();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        assert!(!balance.is_sufficient_for(&amount));
        assert!(matches!(balance.debit(&amount), Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_balance_exact_debit_to_zero() {
        let balance = Balance::new(Decimal::new(100, 0)).unwrap();
        let amount = Amount::new(Decimal::new(100, 0)).unwrap();

        let drained = balance.debit(&amount).unwrap();
        assert_eq!(drained, Balance::zero());
    }
}
