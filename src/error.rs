//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Investment amount out of range ({min} - {max})")]
    InvestmentAmountOutOfRange { min: Decimal, max: Decimal },

    #[error("Loan amount out of range ({min} - {max})")]
    AmountOutOfRange { min: Decimal, max: Decimal },

    #[error("KYC approval required")]
    KycRequired,

    #[error("A pending loan application already exists")]
    PendingApplicationExists,

    #[error("Investment plan not found: {0}")]
    PlanNotFound(String),

    #[error("Loan application not found: {0}")]
    ApplicationNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Loan is not active")]
    LoanNotActive,

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::InvestmentAmountOutOfRange { min, max } => (
                StatusCode::BAD_REQUEST,
                "investment_amount_out_of_range",
                Some(format!("allowed range {} - {}", min, max)),
            ),
            AppError::AmountOutOfRange { min, max } => (
                StatusCode::BAD_REQUEST,
                "amount_out_of_range",
                Some(format!("allowed range {} - {}", min, max)),
            ),
            AppError::PendingApplicationExists => {
                (StatusCode::BAD_REQUEST, "pending_application_exists", None)
            }
            AppError::LoanNotActive => (StatusCode::BAD_REQUEST, "loan_not_active", None),

            // 400 Missing Header
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.to_string()))
            }

            // 401 Unauthorized
            AppError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "invalid_signature", None)
            }

            // 403 Forbidden
            AppError::KycRequired => (StatusCode::FORBIDDEN, "kyc_required", None),

            // 404 Not Found
            AppError::PlanNotFound(id) => {
                (StatusCode::NOT_FOUND, "plan_not_found", Some(id.clone()))
            }
            AppError::ApplicationNotFound(id) => {
                (StatusCode::NOT_FOUND, "application_not_found", Some(id.clone()))
            }
            AppError::LoanNotFound(id) => {
                (StatusCode::NOT_FOUND, "loan_not_found", Some(id.clone()))
            }
            AppError::OrderNotFound(id) => {
                (StatusCode::NOT_FOUND, "order_not_found", Some(id.clone()))
            }

            // Ledger errors map to the closest client/server status
            AppError::Ledger(ref ledger_err) => match ledger_err {
                LedgerError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(ledger_err.to_string()),
                ),
                LedgerError::WalletNotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "wallet_not_found",
                    Some(id.to_string()),
                ),
                LedgerError::InvalidAmount(e) => (
                    StatusCode::BAD_REQUEST,
                    "invalid_amount",
                    Some(e.to_string()),
                ),
                LedgerError::BalanceInvariant(msg) => {
                    tracing::error!("Ledger invariant violation: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "ledger_invariant", None)
                }
                LedgerError::CorruptRow(msg) => {
                    tracing::error!("Corrupt ledger row: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_row", None)
                }
                LedgerError::Database(e) => {
                    tracing::error!("Ledger database error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
            },

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
