//! Payment processor collaborator
//!
//! Quote source for crypto deposit intents. The real processor lives behind
//! an external API; this adapter owns the supported-currency whitelist, the
//! quote shape, and the order expiry window the rest of the core relies on.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// How long a created order stays payable.
const ORDER_TTL_MINUTES: i64 = 30;

/// Quote returned for a deposit intent.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessorQuote {
    /// Processor-side order id; the reconciliation idempotency key
    pub external_order_id: String,
    pub exchange_rate: Decimal,
    pub crypto_amount: Decimal,
    pub payment_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Adapter for the external crypto payment processor.
#[derive(Debug, Clone, Default)]
pub struct PaymentProcessor;

impl PaymentProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Supported settlement pairs.
    pub fn is_supported(currency: &str) -> bool {
        Self::exchange_rate(currency).is_some()
    }

    /// Indicative fiat rate per unit of crypto currency.
    fn exchange_rate(currency: &str) -> Option<Decimal> {
        match currency {
            "BTC" => Some(Decimal::from(45_000)),
            "ETH" => Some(Decimal::from(2_500)),
            "USDT" | "USDC" => Some(Decimal::ONE),
            _ => None,
        }
    }

    /// Produce a payment quote for a deposit intent.
    pub fn quote(&self, fiat_amount: Decimal, currency: &str) -> Result<ProcessorQuote, AppError> {
        let rate = Self::exchange_rate(currency).ok_or_else(|| {
            AppError::InvalidRequest(format!("Unsupported cryptocurrency: {}", currency))
        })?;

        let external_order_id = format!("order_{}", Uuid::new_v4().simple());
        let crypto_amount = (fiat_amount / rate).round_dp(8);

        Ok(ProcessorQuote {
            payment_url: format!("https://pay.example.com/order/{}", external_order_id),
            external_order_id,
            exchange_rate: rate,
            crypto_amount,
            expires_at: Utc::now() + Duration::minutes(ORDER_TTL_MINUTES),
        })
    }
}
