//! Loan Handler
//!
//! Application intake with the advisory eligibility score, the
//! approve/reject decision, and the disbursement and repayment commit units.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::accrual;
use crate::domain::{
    Amount, ApplicationStatus, DurationUnit, EmploymentStatus, LoanStatus, NotificationKind,
    OperationContext, TransactionType,
};
use crate::eligibility::{self, LikelihoodBand};
use crate::error::AppError;
use crate::ledger::{
    BalanceEffect, LedgerEntry, LedgerStore, TransactionRecord, Wallet,
};

use super::{LoanApplicationCommand, LoanDecision, LoanDecisionCommand, LoanPaymentCommand};

/// Loan principal bounds (settlement currency units)
const MIN_LOAN_AMOUNT: i64 = 1_000;
const MAX_LOAN_AMOUNT: i64 = 100_000;

/// A loan application. At most one `pending` application exists per user at
/// any time.
#[derive(Debug, Clone, Serialize)]
pub struct LoanApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub purpose: String,
    pub employment_status: Option<EmploymentStatus>,
    pub monthly_income: Option<Decimal>,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An approved application matured into a loan with amortization fields.
#[derive(Debug, Clone, Serialize)]
pub struct Loan {
    pub id: Uuid,
    pub application_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub interest_rate: Decimal,
    pub term_months: u32,
    pub monthly_payment: Decimal,
    pub total_repayment: Decimal,
    pub outstanding_balance: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of a submitted application: the row plus the advisory score.
#[derive(Debug, Clone, Serialize)]
pub struct LoanApplicationResult {
    pub application: LoanApplication,
    pub eligibility_score: u8,
    pub message: String,
}

/// Result of a decision. The ledger fields are present only on approval,
/// when the disbursement commit unit ran.
#[derive(Debug, Clone, Serialize)]
pub struct LoanDecisionResult {
    pub application: LoanApplication,
    pub loan: Option<Loan>,
    pub wallet: Option<Wallet>,
    pub transaction: Option<TransactionRecord>,
}

/// Result of a loan payment
#[derive(Debug, Clone, Serialize)]
pub struct LoanPaymentResult {
    pub loan: Loan,
    pub wallet: Wallet,
    pub transaction: TransactionRecord,
}

/// Simple-interest amortization over the loan term.
///
/// total interest = principal * rate/100 * term/12; repayment and the flat
/// monthly payment are derived from it. Returns (total_repayment,
/// monthly_payment), both at ledger scale.
pub fn amortize(principal: Decimal, interest_rate: Decimal, term_months: u32) -> (Decimal, Decimal) {
    let rate = interest_rate / Decimal::from(100);
    let years = Decimal::from(term_months) / Decimal::from(12);
    let total_interest = principal * rate * years;
    let total_repayment = (principal + total_interest).round_dp(8);
    let monthly_payment = (total_repayment / Decimal::from(term_months)).round_dp(8);
    (total_repayment, monthly_payment)
}

type ApplicationRow = (
    Uuid,
    Uuid,
    Decimal,
    String,
    Option<String>,
    Option<Decimal>,
    String,
    Option<String>,
    DateTime<Utc>,
);

fn application_from_row(row: ApplicationRow) -> LoanApplication {
    let (
        id,
        user_id,
        amount,
        purpose,
        employment_status,
        monthly_income,
        status,
        rejection_reason,
        created_at,
    ) = row;

    LoanApplication {
        id,
        user_id,
        amount,
        purpose,
        employment_status: employment_status.and_then(|s| s.parse().ok()),
        monthly_income,
        status: ApplicationStatus::from(status),
        rejection_reason,
        created_at,
    }
}

type LoanRow = (
    Uuid,
    Uuid,
    Uuid,
    Decimal,
    Decimal,
    i32,
    Decimal,
    Decimal,
    Decimal,
    DateTime<Utc>,
    DateTime<Utc>,
    String,
    DateTime<Utc>,
);

fn loan_from_row(row: LoanRow) -> Loan {
    let (
        id,
        application_id,
        user_id,
        amount,
        interest_rate,
        term_months,
        monthly_payment,
        total_repayment,
        outstanding_balance,
        start_date,
        end_date,
        status,
        created_at,
    ) = row;

    Loan {
        id,
        application_id,
        user_id,
        amount,
        interest_rate,
        term_months: term_months.max(0) as u32,
        monthly_payment,
        total_repayment,
        outstanding_balance,
        start_date,
        end_date,
        status: LoanStatus::from(status),
        created_at,
    }
}

/// Handler for loan applications and loans
pub struct LoanHandler {
    ledger: LedgerStore,
}

impl LoanHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool),
        }
    }

    /// Submit a loan application. The eligibility score is advisory and is
    /// returned to the caller without influencing the stored status.
    pub async fn apply(
        &self,
        command: LoanApplicationCommand,
        context: &OperationContext,
    ) -> Result<LoanApplicationResult, AppError> {
        let amount: Amount = command
            .amount
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        let min = Decimal::from(MIN_LOAN_AMOUNT);
        let max = Decimal::from(MAX_LOAN_AMOUNT);
        if amount.value() < min || amount.value() > max {
            return Err(AppError::AmountOutOfRange { min, max });
        }

        if command.purpose.trim().is_empty() {
            return Err(AppError::InvalidRequest("Purpose is required".to_string()));
        }

        if !context.kyc_approved {
            return Err(AppError::KycRequired);
        }

        let score = eligibility::score_loan_application(
            amount.value(),
            command.monthly_income,
            command.employment_status,
        );

        let mut tx = self.ledger.begin().await?;

        // One pending application per user. The partial unique index backs
        // this check under concurrent submissions.
        let has_pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM loan_applications
                WHERE user_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(command.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if has_pending {
            return Err(AppError::PendingApplicationExists);
        }

        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO loan_applications (
                user_id, amount, purpose, employment_status, monthly_income, status
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(command.user_id)
        .bind(amount.value())
        .bind(&command.purpose)
        .bind(command.employment_status.map(|s| s.as_str()))
        .bind(command.monthly_income)
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let message = format!(
            "Your loan application for ${} has been submitted and is under review.",
            amount.value()
        );
        self.ledger
            .append_notification(
                &mut tx,
                command.user_id,
                NotificationKind::Loan,
                "Loan Application Submitted",
                &message,
            )
            .await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            user_id = %command.user_id,
            application_id = %id,
            amount = %amount,
            eligibility_score = score,
            "Loan application submitted"
        );

        Ok(LoanApplicationResult {
            application: LoanApplication {
                id,
                user_id: command.user_id,
                amount: amount.value(),
                purpose: command.purpose,
                employment_status: command.employment_status,
                monthly_income: command.monthly_income,
                status: ApplicationStatus::Pending,
                rejection_reason: None,
                created_at,
            },
            eligibility_score: score,
            message: LikelihoodBand::for_score(score).to_string(),
        })
    }

    /// Decide a pending application. Approval matures it into a loan and
    /// runs the disbursement commit unit atomically with the status flip.
    pub async fn decide(
        &self,
        command: LoanDecisionCommand,
        context: &OperationContext,
    ) -> Result<LoanDecisionResult, AppError> {
        let mut tx = self.ledger.begin().await?;

        let application = self
            .lock_application(&mut tx, command.application_id)
            .await?;

        if application.status != ApplicationStatus::Pending {
            return Err(AppError::InvalidRequest(format!(
                "Application already {}",
                application.status
            )));
        }

        match command.decision {
            LoanDecision::Reject { reason } => {
                sqlx::query(
                    r#"
                    UPDATE loan_applications
                    SET status = 'rejected', rejection_reason = $2
                    WHERE id = $1
                    "#,
                )
                .bind(application.id)
                .bind(&reason)
                .execute(&mut *tx)
                .await?;

                self.ledger
                    .append_notification(
                        &mut tx,
                        application.user_id,
                        NotificationKind::Loan,
                        "Loan Application Rejected",
                        &format!("Your loan application was rejected: {}", reason),
                    )
                    .await?;

                tx.commit().await.map_err(AppError::Database)?;

                Ok(LoanDecisionResult {
                    application: LoanApplication {
                        status: ApplicationStatus::Rejected,
                        rejection_reason: Some(reason),
                        ..application
                    },
                    loan: None,
                    wallet: None,
                    transaction: None,
                })
            }
            LoanDecision::Approve {
                interest_rate,
                term_months,
            } => {
                if interest_rate <= Decimal::ZERO {
                    return Err(AppError::InvalidRequest(
                        "Interest rate must be positive".to_string(),
                    ));
                }
                if term_months == 0 {
                    return Err(AppError::InvalidRequest(
                        "Loan term must be at least one month".to_string(),
                    ));
                }

                let (total_repayment, monthly_payment) =
                    amortize(application.amount, interest_rate, term_months);

                let start_date = Utc::now();
                let end_date = accrual::maturity_date(start_date, term_months, DurationUnit::Months);

                sqlx::query(
                    r#"
                    UPDATE loan_applications SET status = 'approved' WHERE id = $1
                    "#,
                )
                .bind(application.id)
                .execute(&mut *tx)
                .await?;

                let (loan_id, loan_created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
                    r#"
                    INSERT INTO loans (
                        application_id, user_id, amount, interest_rate, term_months,
                        monthly_payment, total_repayment, outstanding_balance,
                        start_date, end_date, status
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING id, created_at
                    "#,
                )
                .bind(application.id)
                .bind(application.user_id)
                .bind(application.amount)
                .bind(interest_rate)
                .bind(term_months as i32)
                .bind(monthly_payment)
                .bind(total_repayment)
                .bind(total_repayment)
                .bind(start_date)
                .bind(end_date)
                .bind(LoanStatus::Active.as_str())
                .fetch_one(&mut *tx)
                .await?;

                // Disbursement: credit the wallet inside the same boundary.
                let disbursed =
                    Amount::new(application.amount).map_err(|e| AppError::Internal(e.to_string()))?;
                let wallet = self
                    .ledger
                    .lock_wallet(&mut tx, application.user_id, true)
                    .await?;
                let (transaction, wallet) = self
                    .ledger
                    .append_transaction(
                        &mut tx,
                        &wallet,
                        LedgerEntry::new(
                            TransactionType::LoanDisbursement,
                            disbursed,
                            BalanceEffect::Credit,
                            format!("Loan {} disbursement", loan_id),
                        )
                        .with_reference(loan_id, "loan"),
                    )
                    .await?;

                self.ledger
                    .append_notification(
                        &mut tx,
                        application.user_id,
                        NotificationKind::Loan,
                        "Loan Approved",
                        &format!(
                            "Your loan of ${} was approved and disbursed to your wallet. Monthly payment: ${}",
                            application.amount,
                            monthly_payment.round_dp(2)
                        ),
                    )
                    .await?;

                tx.commit().await.map_err(AppError::Database)?;

                tracing::info!(
                    user_id = %application.user_id,
                    loan_id = %loan_id,
                    amount = %application.amount,
                    correlation_id = ?context.correlation_id,
                    "Loan approved and disbursed"
                );

                Ok(LoanDecisionResult {
                    application: LoanApplication {
                        status: ApplicationStatus::Approved,
                        ..application.clone()
                    },
                    loan: Some(Loan {
                        id: loan_id,
                        application_id: application.id,
                        user_id: application.user_id,
                        amount: application.amount,
                        interest_rate,
                        term_months,
                        monthly_payment,
                        total_repayment,
                        outstanding_balance: total_repayment,
                        start_date,
                        end_date,
                        status: LoanStatus::Active,
                        created_at: loan_created_at,
                    }),
                    wallet: Some(wallet),
                    transaction: Some(transaction),
                })
            }
        }
    }

    /// Make a payment against an active loan. Payments are capped at the
    /// outstanding balance; the loan closes automatically at zero.
    pub async fn pay(
        &self,
        command: LoanPaymentCommand,
        context: &OperationContext,
    ) -> Result<LoanPaymentResult, AppError> {
        let requested: Amount = command
            .amount
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        let mut tx = self.ledger.begin().await?;

        let loan = self.lock_loan(&mut tx, command.loan_id).await?;

        if loan.status != LoanStatus::Active {
            return Err(AppError::LoanNotActive);
        }

        // Cap at the remaining balance rather than rejecting an overpayment.
        let amount = if requested.value() > loan.outstanding_balance {
            Amount::new(loan.outstanding_balance).map_err(|e| AppError::Internal(e.to_string()))?
        } else {
            requested
        };

        let wallet = self
            .ledger
            .lock_wallet(&mut tx, loan.user_id, false)
            .await?;

        let (transaction, wallet) = self
            .ledger
            .append_transaction(
                &mut tx,
                &wallet,
                LedgerEntry::new(
                    TransactionType::LoanPayment,
                    amount,
                    BalanceEffect::Debit,
                    format!("Payment for loan {}", loan.id),
                )
                .with_reference(loan.id, "loan"),
            )
            .await?;

        let new_outstanding = loan.outstanding_balance - amount.value();
        let new_status = if new_outstanding.is_zero() {
            LoanStatus::Closed
        } else {
            LoanStatus::Active
        };

        sqlx::query(
            r#"
            UPDATE loans SET outstanding_balance = $2, status = $3 WHERE id = $1
            "#,
        )
        .bind(loan.id)
        .bind(new_outstanding)
        .bind(new_status.as_str())
        .execute(&mut *tx)
        .await?;

        let message = match new_status {
            LoanStatus::Closed => format!(
                "Your payment of ${} settled loan {}. The loan is now closed.",
                amount.value(),
                loan.id
            ),
            LoanStatus::Active => format!(
                "Your payment of ${} was applied to loan {}. Remaining balance: ${}",
                amount.value(),
                loan.id,
                new_outstanding
            ),
        };
        self.ledger
            .append_notification(
                &mut tx,
                loan.user_id,
                NotificationKind::Loan,
                "Loan Payment Received",
                &message,
            )
            .await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            user_id = %loan.user_id,
            loan_id = %loan.id,
            amount = %amount,
            outstanding = %new_outstanding,
            correlation_id = ?context.correlation_id,
            "Loan payment committed"
        );

        Ok(LoanPaymentResult {
            loan: Loan {
                outstanding_balance: new_outstanding,
                status: new_status,
                ..loan
            },
            wallet,
            transaction,
        })
    }

    async fn lock_application(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        application_id: Uuid,
    ) -> Result<LoanApplication, AppError> {
        let row: Option<ApplicationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, amount, purpose, employment_status, monthly_income,
                   status, rejection_reason, created_at
            FROM loan_applications
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(application_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(application_from_row)
            .ok_or_else(|| AppError::ApplicationNotFound(application_id.to_string()))
    }

    async fn lock_loan(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        loan_id: Uuid,
    ) -> Result<Loan, AppError> {
        let row: Option<LoanRow> = sqlx::query_as(
            r#"
            SELECT id, application_id, user_id, amount, interest_rate, term_months,
                   monthly_payment, total_repayment, outstanding_balance,
                   start_date, end_date, status, created_at
            FROM loans
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(loan_from_row)
            .ok_or_else(|| AppError::LoanNotFound(loan_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amortize_simple_interest() {
        // 12000 at 10% over 12 months: interest 1200, repayment 13200,
        // monthly 1100.
        let (total, monthly) = amortize(dec!(12000), dec!(10), 12);
        assert_eq!(total, dec!(13200));
        assert_eq!(monthly, dec!(1100));
    }

    #[test]
    fn test_amortize_partial_year() {
        // 6000 at 12% over 6 months: interest 6000 * 0.12 * 0.5 = 360.
        let (total, monthly) = amortize(dec!(6000), dec!(12), 6);
        assert_eq!(total, dec!(6360));
        assert_eq!(monthly, dec!(1060));
    }

    #[test]
    fn test_loan_amount_bounds() {
        let min = Decimal::from(MIN_LOAN_AMOUNT);
        let max = Decimal::from(MAX_LOAN_AMOUNT);

        assert!(dec!(999.99) < min);
        assert!(dec!(1000) >= min);
        assert!(dec!(100000) <= max);
        assert!(dec!(100000.01) > max);
    }

    #[test]
    fn test_application_row_parsing() {
        let row: ApplicationRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(5000),
            "Car repair".to_string(),
            Some("self_employed".to_string()),
            Some(dec!(2500)),
            "pending".to_string(),
            None,
            Utc::now(),
        );

        let application = application_from_row(row);
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(
            application.employment_status,
            Some(EmploymentStatus::SelfEmployed)
        );
        assert!(application.rejection_reason.is_none());
    }

    #[test]
    fn test_unknown_employment_status_dropped() {
        let row: ApplicationRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(5000),
            "Car repair".to_string(),
            Some("freelance".to_string()),
            None,
            "pending".to_string(),
            None,
            Utc::now(),
        );

        let application = application_from_row(row);
        assert_eq!(application.employment_status, None);
    }

    #[test]
    fn test_payment_cap_logic() {
        // Requested above outstanding is capped, not rejected.
        let outstanding = dec!(150);
        let requested = Amount::from_integer(500).unwrap();

        let applied = if requested.value() > outstanding {
            Amount::new(outstanding).unwrap()
        } else {
            requested
        };
        assert_eq!(applied.value(), dec!(150));
    }
}
