//! Ledger Store
//!
//! Source of truth for wallet balances. Every balance mutation flows through
//! `append_transaction` inside a caller-owned database transaction, with the
//! wallet row locked `FOR UPDATE` first; two concurrent commit units against
//! the same wallet serialize at the row lock, so `balance_after` is always
//! computed from the stored balance at commit time, never from a stale read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    Amount, Balance, NotificationKind, TransactionStatus, TransactionType,
};

use super::LedgerError;

/// Single settlement currency of this core.
pub const SETTLEMENT_CURRENCY: &str = "USD";

/// A user wallet. `balance` is the available balance; `locked_balance` holds
/// funds earmarked for active investments. Both are non-negative at all
/// times.
#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency: String,
    pub balance: Balance,
    pub locked_balance: Balance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable ledger entry as stored. `amount` is signed: positive for a
/// credit, negative for a debit. Rows are append-only: never updated or
/// deleted after insert.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub external_reference: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// A notification side-effect row, owned by the commit unit that emitted it.
/// Delivery is an external collaborator's job.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

/// How a ledger entry affects the wallet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    /// `balance += amount`
    Credit,
    /// `balance -= amount`; fails on insufficient available funds
    Debit,
    /// `balance -= amount`, `locked_balance += amount` (investment funding)
    DebitToLocked,
}

impl BalanceEffect {
    pub fn is_credit(&self) -> bool {
        matches!(self, BalanceEffect::Credit)
    }
}

/// One entry to append to the ledger.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub tx_type: TransactionType,
    pub amount: Amount,
    pub effect: BalanceEffect,
    pub description: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<&'static str>,
    pub external_reference: Option<String>,
}

impl LedgerEntry {
    pub fn new(
        tx_type: TransactionType,
        amount: Amount,
        effect: BalanceEffect,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tx_type,
            amount,
            effect,
            description: description.into(),
            reference_id: None,
            reference_type: None,
            external_reference: None,
        }
    }

    pub fn with_reference(mut self, reference_id: Uuid, reference_type: &'static str) -> Self {
        self.reference_id = Some(reference_id);
        self.reference_type = Some(reference_type);
        self
    }

    pub fn with_external_reference(mut self, external_reference: String) -> Self {
        self.external_reference = Some(external_reference);
        self
    }
}

type WalletRow = (
    Uuid,
    Uuid,
    String,
    Decimal,
    Decimal,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn wallet_from_row(row: WalletRow) -> Result<Wallet, LedgerError> {
    let (id, user_id, currency, balance, locked_balance, created_at, updated_at) = row;

    let balance = Balance::new(balance)
        .map_err(|e| LedgerError::BalanceInvariant(format!("wallet {}: {}", id, e)))?;
    let locked_balance = Balance::new(locked_balance)
        .map_err(|e| LedgerError::BalanceInvariant(format!("wallet {}: {}", id, e)))?;

    Ok(Wallet {
        id,
        user_id,
        currency,
        balance,
        locked_balance,
        created_at,
        updated_at,
    })
}

/// Ledger store over the backing PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The backing pool, for sibling repositories sharing the store.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a commit-unit transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, LedgerError> {
        Ok(self.pool.begin().await?)
    }

    /// Read a wallet without locking. Returns `None` if the user has no
    /// wallet yet.
    pub async fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>, LedgerError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance, locked_balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1 AND currency = $2
            "#,
        )
        .bind(user_id)
        .bind(SETTLEMENT_CURRENCY)
        .fetch_optional(&self.pool)
        .await?;

        row.map(wallet_from_row).transpose()
    }

    /// Read a wallet, creating it with zero balances on first access.
    pub async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, currency)
            VALUES ($1, $2)
            ON CONFLICT (user_id, currency) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(SETTLEMENT_CURRENCY)
        .execute(&self.pool)
        .await?;

        self.get_wallet(user_id)
            .await?
            .ok_or(LedgerError::WalletNotFound(user_id))
    }

    /// Lock a wallet row for the remainder of the surrounding transaction.
    ///
    /// This is the serialization point for all commit units touching the
    /// same wallet. With `create_if_missing`, a missing wallet is created
    /// lazily (zero balances) and the fresh row is returned locked.
    pub async fn lock_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        create_if_missing: bool,
    ) -> Result<Wallet, LedgerError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, currency, balance, locked_balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1 AND currency = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(SETTLEMENT_CURRENCY)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(row) = row {
            return wallet_from_row(row);
        }

        if !create_if_missing {
            return Err(LedgerError::WalletNotFound(user_id));
        }

        // A row created inside this transaction is exclusively ours until
        // commit; concurrent creators collide on the (user_id, currency)
        // unique constraint instead of double-inserting.
        let row: WalletRow = sqlx::query_as(
            r#"
            INSERT INTO wallets (user_id, currency)
            VALUES ($1, $2)
            RETURNING id, user_id, currency, balance, locked_balance, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(SETTLEMENT_CURRENCY)
        .fetch_one(&mut **tx)
        .await?;

        wallet_from_row(row)
    }

    /// Append a ledger entry and apply its balance effect.
    ///
    /// The only sanctioned way to change a wallet balance. `wallet` must be
    /// the row returned by `lock_wallet` in the same transaction; the new
    /// balances are derived from it and written back together with the
    /// immutable transaction row.
    pub async fn append_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        wallet: &Wallet,
        entry: LedgerEntry,
    ) -> Result<(TransactionRecord, Wallet), LedgerError> {
        let amount = entry.amount;
        let balance_before = wallet.balance.value();

        let (new_balance, new_locked) = match entry.effect {
            BalanceEffect::Credit => (wallet.balance.credit(&amount)?, wallet.locked_balance),
            BalanceEffect::Debit | BalanceEffect::DebitToLocked => {
                if !wallet.balance.is_sufficient_for(&amount) {
                    return Err(LedgerError::InsufficientFunds {
                        required: amount.value(),
                        available: balance_before,
                    });
                }
                let balance = wallet.balance.debit(&amount)?;
                let locked = if entry.effect == BalanceEffect::DebitToLocked {
                    wallet.locked_balance.credit(&amount)?
                } else {
                    wallet.locked_balance
                };
                (balance, locked)
            }
        };

        let balance_after = new_balance.value();
        let signed_amount = amount.signed(entry.effect.is_credit());

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            UPDATE wallets
            SET balance = $2, locked_balance = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(wallet.id)
        .bind(balance_after)
        .bind(new_locked.value())
        .fetch_one(&mut **tx)
        .await?;

        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO transactions (
                user_id, wallet_id, type, amount, balance_before, balance_after,
                description, reference_id, reference_type, external_reference, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, created_at
            "#,
        )
        .bind(wallet.user_id)
        .bind(wallet.id)
        .bind(entry.tx_type.as_str())
        .bind(signed_amount)
        .bind(balance_before)
        .bind(balance_after)
        .bind(&entry.description)
        .bind(entry.reference_id)
        .bind(entry.reference_type)
        .bind(&entry.external_reference)
        .bind(TransactionStatus::Completed.as_str())
        .fetch_one(&mut **tx)
        .await?;

        let record = TransactionRecord {
            id,
            user_id: wallet.user_id,
            wallet_id: wallet.id,
            tx_type: entry.tx_type,
            amount: signed_amount,
            balance_before,
            balance_after,
            description: entry.description,
            reference_id: entry.reference_id,
            reference_type: entry.reference_type.map(str::to_string),
            external_reference: entry.external_reference,
            status: TransactionStatus::Completed,
            created_at,
        };

        let updated_wallet = Wallet {
            balance: new_balance,
            locked_balance: new_locked,
            updated_at,
            ..wallet.clone()
        };

        Ok((record, updated_wallet))
    }

    /// Append a notification row inside the same commit unit.
    pub async fn append_notification(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<Notification, LedgerError> {
        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO notifications (user_id, title, message, kind)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind.as_str())
        .fetch_one(&mut **tx)
        .await?;

        Ok(Notification {
            id,
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            kind,
            created_at,
        })
    }

    /// Recent transactions for a wallet, newest first.
    pub async fn list_transactions(
        &self,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        type TxRow = (
            Uuid,
            Uuid,
            Uuid,
            String,
            Decimal,
            Decimal,
            Decimal,
            String,
            Option<Uuid>,
            Option<String>,
            Option<String>,
            String,
            DateTime<Utc>,
        );

        let rows: Vec<TxRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, wallet_id, type, amount, balance_before, balance_after,
                   description, reference_id, reference_type, external_reference, status,
                   created_at
            FROM transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let (
                    id,
                    user_id,
                    wallet_id,
                    tx_type,
                    amount,
                    balance_before,
                    balance_after,
                    description,
                    reference_id,
                    reference_type,
                    external_reference,
                    status,
                    created_at,
                ) = row;

                let tx_type: TransactionType =
                    tx_type.parse().map_err(LedgerError::CorruptRow)?;

                Ok(TransactionRecord {
                    id,
                    user_id,
                    wallet_id,
                    tx_type,
                    amount,
                    balance_before,
                    balance_after,
                    description,
                    reference_id,
                    reference_type,
                    external_reference,
                    status: TransactionStatus::from(status),
                    created_at,
                })
            })
            .collect()
    }

    /// Replay the completed entries of a wallet and sum their signed
    /// amounts. Ledger conservation demands this equals the stored balance
    /// exactly.
    pub async fn replayed_balance(&self, wallet_id: Uuid) -> Result<Decimal, LedgerError> {
        let sum: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount) FROM transactions
            WHERE wallet_id = $1 AND status = 'completed'
            "#,
        )
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_wallet(balance: Decimal, locked: Decimal) -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            currency: SETTLEMENT_CURRENCY.to_string(),
            balance: Balance::new(balance).unwrap(),
            locked_balance: Balance::new(locked).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wallet_from_row_rejects_negative_balance() {
        let row: WalletRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            SETTLEMENT_CURRENCY.to_string(),
            dec!(-1),
            dec!(0),
            Utc::now(),
            Utc::now(),
        );

        assert!(matches!(
            wallet_from_row(row),
            Err(LedgerError::BalanceInvariant(_))
        ));
    }

    #[test]
    fn test_ledger_entry_builder() {
        let amount = Amount::from_integer(250).unwrap();
        let reference = Uuid::new_v4();

        let entry = LedgerEntry::new(
            TransactionType::Investment,
            amount,
            BalanceEffect::DebitToLocked,
            "Investment in Growth Fund",
        )
        .with_reference(reference, "investment");

        assert_eq!(entry.tx_type, TransactionType::Investment);
        assert_eq!(entry.reference_id, Some(reference));
        assert_eq!(entry.reference_type, Some("investment"));
        assert!(entry.external_reference.is_none());
    }

    #[test]
    fn test_effect_sign_convention() {
        let amount = Amount::from_integer(75).unwrap();
        assert_eq!(amount.signed(BalanceEffect::Credit.is_credit()), dec!(75));
        assert_eq!(amount.signed(BalanceEffect::Debit.is_credit()), dec!(-75));
        assert_eq!(
            amount.signed(BalanceEffect::DebitToLocked.is_credit()),
            dec!(-75)
        );
    }

    #[test]
    fn test_balance_effect_math() {
        // The pure half of append_transaction: effect application.
        let wallet = test_wallet(dec!(500), dec!(0));
        let amount = Amount::from_integer(200).unwrap();

        let debited = wallet.balance.debit(&amount).unwrap();
        let locked = wallet.locked_balance.credit(&amount).unwrap();

        assert_eq!(debited.value(), dec!(300));
        assert_eq!(locked.value(), dec!(200));
    }

    #[test]
    fn test_insufficient_check_precedes_mutation() {
        let wallet = test_wallet(dec!(100), dec!(0));
        let amount = Amount::from_integer(150).unwrap();

        assert!(!wallet.balance.is_sufficient_for(&amount));
    }
}
