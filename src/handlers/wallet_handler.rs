//! Wallet Adjustment Handler
//!
//! Deposit/withdrawal commit unit: one ledger entry plus its notification,
//! atomically.

use sqlx::PgPool;

use crate::domain::{Amount, NotificationKind, OperationContext, TransactionType};
use crate::error::AppError;
use crate::ledger::{BalanceEffect, LedgerEntry, LedgerStore};

use super::{AdjustmentType, WalletAdjustCommand, WalletAdjustResult};

/// Handler for direct wallet adjustments
pub struct WalletHandler {
    ledger: LedgerStore,
}

impl WalletHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerStore::new(pool),
        }
    }

    /// Execute the adjustment command
    pub async fn execute(
        &self,
        command: WalletAdjustCommand,
        context: &OperationContext,
    ) -> Result<WalletAdjustResult, AppError> {
        let amount: Amount = command
            .amount
            .parse()
            .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))?;

        let (tx_type, effect) = match command.adjust_type {
            AdjustmentType::Deposit => (TransactionType::Deposit, BalanceEffect::Credit),
            AdjustmentType::Withdrawal => (TransactionType::Withdrawal, BalanceEffect::Debit),
        };

        let description = command
            .description
            .unwrap_or_else(|| format!("{} transaction", command.adjust_type.as_str()));

        let mut tx = self.ledger.begin().await?;

        // Wallets are created lazily on first access.
        let wallet = self
            .ledger
            .lock_wallet(&mut tx, command.user_id, true)
            .await?;

        let (transaction, wallet) = self
            .ledger
            .append_transaction(
                &mut tx,
                &wallet,
                LedgerEntry::new(tx_type, amount, effect, description),
            )
            .await?;

        let (title, message) = match command.adjust_type {
            AdjustmentType::Deposit => (
                "Deposit Successful",
                format!("${} has been added to your wallet.", amount.value()),
            ),
            AdjustmentType::Withdrawal => (
                "Withdrawal Successful",
                format!("${} has been withdrawn from your wallet.", amount.value()),
            ),
        };

        self.ledger
            .append_notification(
                &mut tx,
                command.user_id,
                NotificationKind::Transaction,
                title,
                &message,
            )
            .await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            user_id = %command.user_id,
            adjust_type = command.adjust_type.as_str(),
            amount = %amount,
            correlation_id = ?context.correlation_id,
            "Wallet adjustment committed"
        );

        Ok(WalletAdjustResult {
            wallet,
            transaction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_invalid_amount_rejected_before_any_store_work() {
        let cmd = WalletAdjustCommand::new(
            Uuid::new_v4(),
            AdjustmentType::Deposit,
            "-50".to_string(),
        );
        let parsed: Result<Amount, _> = cmd.amount.parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn test_default_description() {
        let cmd = WalletAdjustCommand::new(
            Uuid::new_v4(),
            AdjustmentType::Withdrawal,
            "25".to_string(),
        );
        let description = cmd
            .description
            .unwrap_or_else(|| format!("{} transaction", cmd.adjust_type.as_str()));
        assert_eq!(description, "withdrawal transaction");
    }
}
