//! Handler tests
//!
//! Pure-logic coverage for the commit units. Everything touching the store
//! lives in tests/ and requires a provisioned database.

#[cfg(test)]
mod tests {
    use crate::accrual;
    use crate::domain::{Amount, Balance, CompoundFrequency, DurationUnit, EmploymentStatus};
    use crate::eligibility::{self, LikelihoodBand};
    use crate::handlers::{
        amortize, AdjustmentType, FundInvestmentCommand, LoanApplicationCommand,
        WalletAdjustCommand,
    };
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    // =========================================================================
    // Funding validation
    // =========================================================================

    #[test]
    fn test_fund_command_amount_must_parse_positive() {
        let cmd = FundInvestmentCommand::new(Uuid::new_v4(), Uuid::new_v4(), "0".to_string());
        assert!(cmd.amount.parse::<Amount>().is_err());

        let cmd = FundInvestmentCommand::new(Uuid::new_v4(), Uuid::new_v4(), "250".to_string());
        assert!(cmd.amount.parse::<Amount>().is_ok());
    }

    #[test]
    fn test_funding_projection_matches_worked_example() {
        // 1000 at 12% for 12 months compounded monthly projects ~126.83.
        let profit = accrual::expected_profit(
            dec!(1000),
            dec!(12),
            12,
            DurationUnit::Months,
            CompoundFrequency::Monthly,
        );
        assert_eq!(profit.round_dp(2), dec!(126.83));
    }

    #[test]
    fn test_insufficient_balance_detected_before_mutation() {
        // A wallet holding 500 cannot fund 600; the check runs against the
        // locked row before any row is written.
        let balance = Balance::new(dec!(500)).unwrap();
        let principal = Amount::from_integer(600).unwrap();
        assert!(!balance.is_sufficient_for(&principal));

        let principal = Amount::from_integer(500).unwrap();
        assert!(balance.is_sufficient_for(&principal));
    }

    #[test]
    fn test_funding_moves_balance_to_locked() {
        // Debit available, credit locked; the wallet total is conserved.
        let available = Balance::new(dec!(500)).unwrap();
        let locked = Balance::zero();
        let principal = Amount::from_integer(200).unwrap();

        let available_after = available.debit(&principal).unwrap();
        let locked_after = locked.credit(&principal).unwrap();

        assert_eq!(available_after.value(), dec!(300));
        assert_eq!(locked_after.value(), dec!(200));
        assert_eq!(
            available_after.value() + locked_after.value(),
            available.value() + locked.value()
        );
    }

    // =========================================================================
    // Wallet adjustment
    // =========================================================================

    #[test]
    fn test_withdrawal_cannot_overdraw() {
        let balance = Balance::new(dec!(40)).unwrap();
        let withdrawal = Amount::from_integer(41).unwrap();
        assert!(balance.debit(&withdrawal).is_err());
    }

    #[test]
    fn test_adjust_command_round_trip() {
        let cmd = WalletAdjustCommand::new(
            Uuid::new_v4(),
            AdjustmentType::Withdrawal,
            "75.25".to_string(),
        );

        let amount: Amount = cmd.amount.parse().unwrap();
        assert_eq!(amount.value(), dec!(75.25));
        assert_eq!(amount.signed(false), dec!(-75.25));
    }

    // =========================================================================
    // Loan application scoring
    // =========================================================================

    #[test]
    fn test_score_is_advisory_and_complete() {
        // Worked example: 5000 at 3000/month, employed => 100.
        let cmd = LoanApplicationCommand::new(
            Uuid::new_v4(),
            "5000".to_string(),
            "Debt consolidation".to_string(),
        )
        .with_employment(EmploymentStatus::Employed)
        .with_monthly_income(dec!(3000));

        let amount: Amount = cmd.amount.parse().unwrap();
        let score = eligibility::score_loan_application(
            amount.value(),
            cmd.monthly_income,
            cmd.employment_status,
        );

        assert_eq!(score, 100);
        assert_eq!(LikelihoodBand::for_score(score), LikelihoodBand::High);
    }

    #[test]
    fn test_score_regardless_of_pending_state() {
        // The score is computed from the inputs alone; a second application
        // with identical inputs scores identically (the handler rejects it
        // on the pending invariant, not the score).
        let score_a = eligibility::score_loan_application(dec!(5000), Some(dec!(3000)), None);
        let score_b = eligibility::score_loan_application(dec!(5000), Some(dec!(3000)), None);
        assert_eq!(score_a, score_b);
    }

    // =========================================================================
    // Loan amortization
    // =========================================================================

    #[test]
    fn test_disbursement_terms() {
        // 24000 at 15% over 24 months: interest 7200, repayment 31200,
        // monthly 1300.
        let (total, monthly) = amortize(dec!(24000), dec!(15), 24);
        assert_eq!(total, dec!(31200));
        assert_eq!(monthly, dec!(1300));
    }

    #[test]
    fn test_monthly_payments_cover_total() {
        let (total, monthly) = amortize(dec!(10000), dec!(12), 12);
        assert!(monthly * dec!(12) >= total - dec!(0.00000012));
    }
}
