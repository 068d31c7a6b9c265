//! Eligibility Scorer
//!
//! Pure approval-likelihood heuristic for loan applications. The score is
//! advisory: it is returned to the caller next to the created application
//! and never gates or alters the application status.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

use crate::domain::EmploymentStatus;

/// Assumed monthly payment as a fraction of principal when estimating the
/// debt-to-income ratio.
const ASSUMED_MONTHLY_PAYMENT_RATE: f64 = 0.10;

/// Score a loan application on a 0–100 scale.
///
/// Additive rule set, evaluated in fixed order:
/// - debt-to-income below 0.30 adds 50, below 0.50 adds 25 (only when a
///   positive monthly income was supplied);
/// - employed adds 30, self-employed adds 20;
/// - principal under 10,000 adds 20.
pub fn score_loan_application(
    amount: Decimal,
    monthly_income: Option<Decimal>,
    employment_status: Option<EmploymentStatus>,
) -> u8 {
    let mut score: u8 = 0;

    if let Some(income) = monthly_income {
        let income = income.to_f64().unwrap_or(0.0);
        if income > 0.0 {
            let principal = amount.to_f64().unwrap_or(0.0);
            let debt_to_income = (principal * ASSUMED_MONTHLY_PAYMENT_RATE) / income;

            if debt_to_income < 0.30 {
                score += 50;
            } else if debt_to_income < 0.50 {
                score += 25;
            }
        }
    }

    match employment_status {
        Some(EmploymentStatus::Employed) => score += 30,
        Some(EmploymentStatus::SelfEmployed) => score += 20,
        _ => {}
    }

    if amount < Decimal::from(10_000) {
        score += 20;
    }

    score
}

/// Human-readable approval-likelihood band for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikelihoodBand {
    High,
    Moderate,
    Low,
}

impl LikelihoodBand {
    pub fn for_score(score: u8) -> Self {
        if score >= 70 {
            LikelihoodBand::High
        } else if score >= 40 {
            LikelihoodBand::Moderate
        } else {
            LikelihoodBand::Low
        }
    }
}

impl fmt::Display for LikelihoodBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LikelihoodBand::High => write!(f, "High approval likelihood"),
            LikelihoodBand::Moderate => write!(f, "Moderate approval likelihood"),
            LikelihoodBand::Low => {
                write!(f, "Low approval likelihood - consider improving your profile")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_full_score() {
        // 5000 at 3000/month, employed:
        // DTI = 500/3000 = 0.1667 -> +50; employed -> +30; amount < 10000 -> +20.
        let score = score_loan_application(
            dec!(5000),
            Some(dec!(3000)),
            Some(EmploymentStatus::Employed),
        );
        assert_eq!(score, 100);
    }

    #[test]
    fn test_moderate_dti_partial_credit() {
        // 12000 at 3000/month: DTI = 1200/3000 = 0.40 -> +25.
        // Self-employed -> +20. Amount >= 10000 -> no size bonus.
        let score = score_loan_application(
            dec!(12000),
            Some(dec!(3000)),
            Some(EmploymentStatus::SelfEmployed),
        );
        assert_eq!(score, 45);
    }

    #[test]
    fn test_high_dti_no_income_credit() {
        // 50000 at 2000/month: DTI = 5000/2000 = 2.5 -> +0.
        let score = score_loan_application(
            dec!(50000),
            Some(dec!(2000)),
            Some(EmploymentStatus::Employed),
        );
        assert_eq!(score, 30);
    }

    #[test]
    fn test_missing_income_skips_dti_rule() {
        let score = score_loan_application(dec!(5000), None, Some(EmploymentStatus::Employed));
        assert_eq!(score, 50);
    }

    #[test]
    fn test_zero_income_skips_dti_rule() {
        let score = score_loan_application(dec!(5000), Some(Decimal::ZERO), None);
        assert_eq!(score, 20);
    }

    #[test]
    fn test_unemployed_gets_no_employment_credit() {
        let score = score_loan_application(
            dec!(5000),
            Some(dec!(3000)),
            Some(EmploymentStatus::Unemployed),
        );
        assert_eq!(score, 70);
    }

    #[test]
    fn test_dti_boundary_is_exclusive() {
        // DTI exactly 0.30 must fall into the 0.50 band: 9000 * 0.10 / 3000 = 0.30.
        let score = score_loan_application(dec!(9000), Some(dec!(3000)), None);
        assert_eq!(score, 25 + 20);
    }

    #[test]
    fn test_amount_boundary_is_exclusive() {
        // Exactly 10000 gets no size bonus.
        let score = score_loan_application(dec!(10000), None, None);
        assert_eq!(score, 0);

        let score = score_loan_application(dec!(9999.99), None, None);
        assert_eq!(score, 20);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(LikelihoodBand::for_score(100), LikelihoodBand::High);
        assert_eq!(LikelihoodBand::for_score(70), LikelihoodBand::High);
        assert_eq!(LikelihoodBand::for_score(69), LikelihoodBand::Moderate);
        assert_eq!(LikelihoodBand::for_score(40), LikelihoodBand::Moderate);
        assert_eq!(LikelihoodBand::for_score(39), LikelihoodBand::Low);
        assert_eq!(LikelihoodBand::for_score(0), LikelihoodBand::Low);
    }
}
