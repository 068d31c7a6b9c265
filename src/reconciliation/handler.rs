//! Reconciliation Handler
//!
//! Applies asynchronous payment-confirmation events from the external
//! crypto processor to the ledger exactly once. The order row is the
//! idempotency anchor: `external_order_id` is unique, the row is locked
//! `FOR UPDATE` while an event is processed, and the `pending` -> terminal
//! transition doubles as the one-time applied marker. Redelivered events
//! against a terminal order succeed with no side effects.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::Sha256;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, NotificationKind, OperationContext, OrderStatus, TransactionType};
use crate::error::AppError;
use crate::ledger::{BalanceEffect, LedgerEntry, LedgerStore};

use super::{PaymentProcessor, ProcessorQuote};

/// Deposit intent bounds (settlement currency units)
const MIN_DEPOSIT: i64 = 10;
const MAX_DEPOSIT: i64 = 50_000;

/// Deposits at or above this require KYC approval.
const KYC_DEPOSIT_THRESHOLD: i64 = 1_000;

/// A pending external payment. Transitions exactly once from `pending` to a
/// terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct CryptoOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub crypto_amount: Decimal,
    pub crypto_currency: String,
    pub fiat_amount: Decimal,
    pub exchange_rate: Decimal,
    pub external_order_id: String,
    pub payment_url: String,
    pub status: OrderStatus,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Command to create a crypto deposit intent
#[derive(Debug, Clone)]
pub struct CreateDepositCommand {
    pub user_id: Uuid,
    /// Fiat amount as string for precise decimal handling
    pub amount: String,
    pub crypto_currency: String,
}

/// Status carried by an inbound payment event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventStatus {
    Confirmed,
    Failed,
    Expired,
}

impl PaymentEventStatus {
    /// Parse the processor's status vocabulary. Both "completed" and
    /// "confirmed" arrive for successful payments.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "completed" | "confirmed" => Ok(PaymentEventStatus::Confirmed),
            "failed" => Ok(PaymentEventStatus::Failed),
            "expired" => Ok(PaymentEventStatus::Expired),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown payment event status: {}",
                other
            ))),
        }
    }

    /// The terminal order status this event drives the order into.
    pub fn target_status(&self) -> OrderStatus {
        match self {
            PaymentEventStatus::Confirmed => OrderStatus::Completed,
            PaymentEventStatus::Failed => OrderStatus::Failed,
            PaymentEventStatus::Expired => OrderStatus::Expired,
        }
    }
}

/// Outcome of applying a payment event. `applied` is false for idempotent
/// replays, which are successes, not errors.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationOutcome {
    pub applied: bool,
    pub order_status: OrderStatus,
}

type OrderRow = (
    Uuid,
    Uuid,
    Decimal,
    String,
    Decimal,
    Decimal,
    String,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

fn order_from_row(row: OrderRow) -> CryptoOrder {
    let (
        id,
        user_id,
        crypto_amount,
        crypto_currency,
        fiat_amount,
        exchange_rate,
        external_order_id,
        payment_url,
        status,
        expires_at,
        completed_at,
        created_at,
    ) = row;

    CryptoOrder {
        id,
        user_id,
        crypto_amount,
        crypto_currency,
        fiat_amount,
        exchange_rate,
        external_order_id,
        payment_url,
        status: OrderStatus::from(status),
        expires_at,
        completed_at,
        created_at,
    }
}

/// Verify the processor's HMAC-SHA256 webhook signature.
pub fn verify_webhook_signature(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    let signature = match hex::decode(signature_hex.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    mac.verify_slice(&signature).is_ok()
}

/// Handler for crypto deposit orders and payment-event reconciliation
pub struct ReconciliationHandler {
    ledger: LedgerStore,
    processor: PaymentProcessor,
}

impl ReconciliationHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool),
            processor: PaymentProcessor::new(),
        }
    }

    /// Create a deposit intent: validate bounds, quote the processor, and
    /// record the pending order. No balance is touched until the payment is
    /// confirmed by the webhook.
    pub async fn create_order(
        &self,
        command: CreateDepositCommand,
        context: &OperationContext,
    ) -> Result<CryptoOrder, AppError> {
        let amount: Amount = command
            .amount
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        let min = Decimal::from(MIN_DEPOSIT);
        let max = Decimal::from(MAX_DEPOSIT);
        if amount.value() < min || amount.value() > max {
            return Err(AppError::AmountOutOfRange { min, max });
        }

        if amount.value() >= Decimal::from(KYC_DEPOSIT_THRESHOLD) && !context.kyc_approved {
            return Err(AppError::KycRequired);
        }

        let quote: ProcessorQuote = self
            .processor
            .quote(amount.value(), &command.crypto_currency)?;

        let mut tx = self.ledger.begin().await?;

        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO crypto_orders (
                user_id, crypto_amount, crypto_currency, fiat_amount, exchange_rate,
                external_order_id, payment_url, status, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, created_at
            "#,
        )
        .bind(command.user_id)
        .bind(quote.crypto_amount)
        .bind(&command.crypto_currency)
        .bind(amount.value())
        .bind(quote.exchange_rate)
        .bind(&quote.external_order_id)
        .bind(&quote.payment_url)
        .bind(OrderStatus::Pending.as_str())
        .bind(quote.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        let message = format!(
            "Your crypto deposit order for ${} has been created. Complete payment within 30 minutes.",
            amount.value()
        );
        self.ledger
            .append_notification(
                &mut tx,
                command.user_id,
                NotificationKind::Transaction,
                "Deposit Order Created",
                &message,
            )
            .await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            user_id = %command.user_id,
            external_order_id = %quote.external_order_id,
            fiat_amount = %amount,
            currency = %command.crypto_currency,
            "Crypto deposit order created"
        );

        Ok(CryptoOrder {
            id,
            user_id: command.user_id,
            crypto_amount: quote.crypto_amount,
            crypto_currency: command.crypto_currency,
            fiat_amount: amount.value(),
            exchange_rate: quote.exchange_rate,
            external_order_id: quote.external_order_id,
            payment_url: quote.payment_url,
            status: OrderStatus::Pending,
            expires_at: quote.expires_at,
            completed_at: None,
            created_at,
        })
    }

    /// Apply an external payment event to the ledger, exactly once.
    ///
    /// Events against an unknown order fail with `OrderNotFound` (logged,
    /// never retried from here). Events against a terminal order return
    /// success with `applied: false`. A confirmed event against a pending
    /// order credits the wallet, appends the deposit transaction, and flips
    /// the order to `completed` in one all-or-nothing boundary, so a crash
    /// after the processor confirmed but before our commit leaves the order
    /// `pending`, and redelivery applies the credit exactly once.
    pub async fn apply_payment_event(
        &self,
        external_order_id: &str,
        event_status: PaymentEventStatus,
        external_ref: Option<&str>,
    ) -> Result<ReconciliationOutcome, AppError> {
        let mut tx = self.ledger.begin().await?;

        let order = match self.lock_order(&mut tx, external_order_id).await? {
            Some(order) => order,
            None => {
                tracing::warn!(
                    external_order_id = external_order_id,
                    "Payment event for unknown order"
                );
                return Err(AppError::OrderNotFound(external_order_id.to_string()));
            }
        };

        // Idempotency guard: terminal orders never transition again.
        if order.status.is_terminal() {
            tracing::info!(
                external_order_id = external_order_id,
                status = %order.status,
                "Duplicate payment event ignored"
            );
            return Ok(ReconciliationOutcome {
                applied: false,
                order_status: order.status,
            });
        }

        match event_status {
            PaymentEventStatus::Confirmed => {
                let deposit = Amount::new(order.fiat_amount)
                    .map_err(|e| AppError::Internal(e.to_string()))?;

                let wallet = self.ledger.lock_wallet(&mut tx, order.user_id, true).await?;

                self.ledger
                    .append_transaction(
                        &mut tx,
                        &wallet,
                        LedgerEntry::new(
                            TransactionType::Deposit,
                            deposit,
                            BalanceEffect::Credit,
                            format!("Crypto deposit via {}", order.crypto_currency),
                        )
                        .with_reference(order.id, "crypto_deposit")
                        .with_external_reference(
                            external_ref.unwrap_or(external_order_id).to_string(),
                        ),
                    )
                    .await?;

                // One-time applied marker: only the writer that moves the row
                // out of `pending` may keep its ledger entry.
                let flipped = sqlx::query(
                    r#"
                    UPDATE crypto_orders
                    SET status = 'completed', completed_at = NOW(), updated_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(order.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if flipped == 0 {
                    // Unreachable while we hold the row lock; abort rather
                    // than double-credit if the store proves us wrong.
                    return Err(AppError::Internal(format!(
                        "Order {} left pending state mid-reconciliation",
                        order.id
                    )));
                }

                let message = format!(
                    "Your crypto deposit of ${} has been confirmed and added to your wallet.",
                    order.fiat_amount
                );
                self.ledger
                    .append_notification(
                        &mut tx,
                        order.user_id,
                        NotificationKind::Transaction,
                        "Deposit Confirmed",
                        &message,
                    )
                    .await?;

                tx.commit().await.map_err(AppError::Database)?;

                tracing::info!(
                    external_order_id = external_order_id,
                    user_id = %order.user_id,
                    fiat_amount = %order.fiat_amount,
                    "Crypto deposit reconciled"
                );

                Ok(ReconciliationOutcome {
                    applied: true,
                    order_status: OrderStatus::Completed,
                })
            }
            PaymentEventStatus::Failed | PaymentEventStatus::Expired => {
                let target = event_status.target_status();

                sqlx::query(
                    r#"
                    UPDATE crypto_orders
                    SET status = $2, updated_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(order.id)
                .bind(target.as_str())
                .execute(&mut *tx)
                .await?;

                let message = format!(
                    "Your crypto deposit order has {}. Please try again or contact support.",
                    target
                );
                self.ledger
                    .append_notification(
                        &mut tx,
                        order.user_id,
                        NotificationKind::Transaction,
                        "Deposit Failed",
                        &message,
                    )
                    .await?;

                tx.commit().await.map_err(AppError::Database)?;

                tracing::info!(
                    external_order_id = external_order_id,
                    status = %target,
                    "Crypto order marked terminal without balance change"
                );

                Ok(ReconciliationOutcome {
                    applied: true,
                    order_status: target,
                })
            }
        }
    }

    /// A user's deposit orders, newest first (collaborator-facing reads).
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<CryptoOrder>, AppError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, crypto_amount, crypto_currency, fiat_amount, exchange_rate,
                   external_order_id, payment_url, status, expires_at, completed_at, created_at
            FROM crypto_orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .fetch_all(self.ledger.pool())
        .await?;

        Ok(rows.into_iter().map(order_from_row).collect())
    }

    async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        external_order_id: &str,
    ) -> Result<Option<CryptoOrder>, AppError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, crypto_amount, crypto_currency, fiat_amount, exchange_rate,
                   external_order_id, payment_url, status, expires_at, completed_at, created_at
            FROM crypto_orders
            WHERE external_order_id = $1
            FOR UPDATE
            "#,
        )
        .bind(external_order_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(order_from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_status_parsing() {
        assert_eq!(
            PaymentEventStatus::parse("completed").unwrap(),
            PaymentEventStatus::Confirmed
        );
        assert_eq!(
            PaymentEventStatus::parse("confirmed").unwrap(),
            PaymentEventStatus::Confirmed
        );
        assert_eq!(
            PaymentEventStatus::parse("failed").unwrap(),
            PaymentEventStatus::Failed
        );
        assert_eq!(
            PaymentEventStatus::parse("expired").unwrap(),
            PaymentEventStatus::Expired
        );
        assert!(PaymentEventStatus::parse("refunded").is_err());
    }

    #[test]
    fn test_event_target_status() {
        assert_eq!(
            PaymentEventStatus::Confirmed.target_status(),
            OrderStatus::Completed
        );
        assert_eq!(
            PaymentEventStatus::Failed.target_status(),
            OrderStatus::Failed
        );
        assert_eq!(
            PaymentEventStatus::Expired.target_status(),
            OrderStatus::Expired
        );
    }

    #[test]
    fn test_deposit_bounds() {
        let min = Decimal::from(MIN_DEPOSIT);
        let max = Decimal::from(MAX_DEPOSIT);

        assert!(dec!(9.99) < min);
        assert!(dec!(10) >= min);
        assert!(dec!(50000) <= max);
        assert!(dec!(50000.01) > max);
    }

    #[test]
    fn test_kyc_threshold_boundary() {
        let threshold = Decimal::from(KYC_DEPOSIT_THRESHOLD);
        assert!(dec!(999.99) < threshold);
        assert!(dec!(1000) >= threshold);
    }

    #[test]
    fn test_order_row_status_parsing() {
        let row: OrderRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(0.01),
            "BTC".to_string(),
            dec!(450),
            dec!(45000),
            "order_abc".to_string(),
            "https://pay.example.com/order/order_abc".to_string(),
            "completed".to_string(),
            Utc::now(),
            Some(Utc::now()),
            Utc::now(),
        );

        let order = order_from_row(row);
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_webhook_signature_round_trip() {
        let secret = "whsec_test";
        let payload = br#"{"order_id":"order_abc","status":"completed"}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_webhook_signature(payload, &signature, secret));
        assert!(!verify_webhook_signature(payload, &signature, "other_secret"));
        assert!(!verify_webhook_signature(b"tampered", &signature, secret));
    }

    #[test]
    fn test_webhook_signature_malformed_hex() {
        assert!(!verify_webhook_signature(b"payload", "not-hex", "secret"));
        assert!(!verify_webhook_signature(b"payload", "", "secret"));
    }
}
