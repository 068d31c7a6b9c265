//! API Routes
//!
//! Collaborator-facing HTTP surface for the ledger commit units and the
//! payment-processor webhook. Request validation here is limited to shape;
//! the handlers own every business rule.

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog::{InvestmentPlan, NewPlan, PlanCatalog};
use crate::domain::{EmploymentStatus, OperationContext};
use crate::error::AppError;
use crate::handlers::{
    AdjustmentType, FundInvestmentCommand, FundInvestmentResult, InvestHandler, Investment,
    LoanApplicationCommand, LoanApplicationResult, LoanDecision, LoanDecisionCommand,
    LoanDecisionResult, LoanHandler, LoanPaymentCommand, LoanPaymentResult, WalletAdjustCommand,
    WalletAdjustResult, WalletHandler,
};
use crate::ledger::{LedgerStore, TransactionRecord, Wallet};
use crate::reconciliation::{
    verify_webhook_signature, CreateDepositCommand, CryptoOrder, PaymentEventStatus,
    ReconciliationHandler,
};

use super::middleware::require_user;

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub webhook_secret: Option<String>,
}

/// Header carrying the processor's webhook signature
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct WalletAdjustRequest {
    #[serde(rename = "type")]
    pub adjust_type: AdjustmentType,
    pub amount: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    pub wallet: Wallet,
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Deserialize)]
pub struct FundInvestmentRequest {
    pub plan_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<InvestmentPlan>,
}

#[derive(Debug, Serialize)]
pub struct InvestmentsResponse {
    pub investments: Vec<Investment>,
}

#[derive(Debug, Deserialize)]
pub struct LoanApplicationRequest {
    pub amount: String,
    pub purpose: String,
    #[serde(default)]
    pub employment_status: Option<EmploymentStatus>,
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum LoanDecisionRequest {
    Approve {
        interest_rate: Decimal,
        term_months: u32,
    },
    Reject {
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
pub struct LoanPaymentRequest {
    pub amount: String,
}

fn default_deposit_currency() -> String {
    "USDT".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateDepositRequest {
    pub amount: String,
    #[serde(default = "default_deposit_currency")]
    pub crypto_currency: String,
}

#[derive(Debug, Serialize)]
pub struct CreateDepositResponse {
    pub order: CryptoOrder,
}

#[derive(Debug, Serialize)]
pub struct DepositOrdersResponse {
    pub orders: Vec<CryptoOrder>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub applied: bool,
    pub order_status: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Wallet
        .route("/wallets/balance", get(get_wallet_balance))
        .route("/wallets/adjust", post(adjust_wallet))
        // Investments
        .route("/investment-plans", get(list_plans))
        .route("/investment-plans", post(create_plan))
        .route("/investments", get(list_investments))
        .route("/investments", post(fund_investment))
        // Loans
        .route("/loans/applications", post(apply_for_loan))
        .route("/loans/applications/:application_id/decision", post(decide_loan))
        .route("/loans/:loan_id/payments", post(pay_loan))
        // Crypto deposits
        .route("/crypto-deposits", get(list_deposits))
        .route("/crypto-deposits", post(create_deposit))
        .route("/crypto-deposits/webhook", post(payment_webhook))
}

// =========================================================================
// Wallet endpoints
// =========================================================================

/// Current wallet (created lazily) plus recent ledger entries
async fn get_wallet_balance(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<WalletBalanceResponse>, AppError> {
    let user_id = require_user(&context)?;

    let ledger = LedgerStore::new(state.pool);
    let wallet = ledger.get_or_create_wallet(user_id).await?;
    let transactions = ledger.list_transactions(wallet.id, 50).await?;

    Ok(Json(WalletBalanceResponse {
        wallet,
        transactions,
    }))
}

/// Deposit into or withdraw from the wallet
async fn adjust_wallet(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<WalletAdjustRequest>,
) -> Result<Json<WalletAdjustResult>, AppError> {
    let user_id = require_user(&context)?;

    let mut command = WalletAdjustCommand::new(user_id, request.adjust_type, request.amount);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let result = WalletHandler::new(state.pool)
        .execute(command, &context)
        .await?;

    Ok(Json(result))
}

// =========================================================================
// Investment endpoints
// =========================================================================

async fn list_plans(State(state): State<AppState>) -> Result<Json<PlansResponse>, AppError> {
    let plans = PlanCatalog::new(state.pool).list_active().await?;
    Ok(Json(PlansResponse { plans }))
}

/// Create a catalog entry. Admin gating happens at the gateway.
async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<NewPlan>,
) -> Result<(StatusCode, Json<InvestmentPlan>), AppError> {
    let plan = PlanCatalog::new(state.pool).create(request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn list_investments(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<InvestmentsResponse>, AppError> {
    let user_id = require_user(&context)?;

    let investments = InvestHandler::new(state.pool).list_for_user(user_id).await?;

    Ok(Json(InvestmentsResponse { investments }))
}

async fn fund_investment(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<FundInvestmentRequest>,
) -> Result<(StatusCode, Json<FundInvestmentResult>), AppError> {
    let user_id = require_user(&context)?;

    let command = FundInvestmentCommand::new(user_id, request.plan_id, request.amount);
    let result = InvestHandler::new(state.pool)
        .execute(command, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// =========================================================================
// Loan endpoints
// =========================================================================

async fn apply_for_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<LoanApplicationRequest>,
) -> Result<(StatusCode, Json<LoanApplicationResult>), AppError> {
    let user_id = require_user(&context)?;

    let mut command = LoanApplicationCommand::new(user_id, request.amount, request.purpose);
    if let Some(status) = request.employment_status {
        command = command.with_employment(status);
    }
    if let Some(income) = request.monthly_income {
        command = command.with_monthly_income(income);
    }

    let result = LoanHandler::new(state.pool).apply(command, &context).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

async fn decide_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(application_id): Path<Uuid>,
    Json(request): Json<LoanDecisionRequest>,
) -> Result<Json<LoanDecisionResult>, AppError> {
    let decision = match request {
        LoanDecisionRequest::Approve {
            interest_rate,
            term_months,
        } => LoanDecision::Approve {
            interest_rate,
            term_months,
        },
        LoanDecisionRequest::Reject { reason } => LoanDecision::Reject { reason },
    };

    let command = LoanDecisionCommand {
        application_id,
        decision,
    };
    let result = LoanHandler::new(state.pool).decide(command, &context).await?;

    Ok(Json(result))
}

async fn pay_loan(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<LoanPaymentRequest>,
) -> Result<Json<LoanPaymentResult>, AppError> {
    // Payments are taken from the loan owner's wallet regardless of caller;
    // the gateway has already scoped this route to the owner.
    require_user(&context)?;

    let command = LoanPaymentCommand {
        loan_id,
        amount: request.amount,
    };
    let result = LoanHandler::new(state.pool).pay(command, &context).await?;

    Ok(Json(result))
}

// =========================================================================
// Crypto deposit endpoints
// =========================================================================

async fn list_deposits(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<DepositOrdersResponse>, AppError> {
    let user_id = require_user(&context)?;

    let orders = ReconciliationHandler::new(state.pool)
        .list_orders(user_id)
        .await?;

    Ok(Json(DepositOrdersResponse { orders }))
}

async fn create_deposit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateDepositRequest>,
) -> Result<(StatusCode, Json<CreateDepositResponse>), AppError> {
    let user_id = require_user(&context)?;

    let command = CreateDepositCommand {
        user_id,
        amount: request.amount,
        crypto_currency: request.crypto_currency,
    };
    let order = ReconciliationHandler::new(state.pool)
        .create_order(command, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(CreateDepositResponse { order })))
}

/// Webhook entry point for payment confirmations. Always succeeds for
/// idempotent replays; unknown orders are logged and rejected so the
/// processor's dashboard surfaces them.
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get(WEBHOOK_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::MissingHeader(WEBHOOK_SIGNATURE_HEADER))?;

        if !verify_webhook_signature(&body, signature, secret) {
            return Err(AppError::InvalidSignature);
        }
    }

    let request: WebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook payload: {}", e)))?;

    let event_status = PaymentEventStatus::parse(&request.status)?;

    let outcome = ReconciliationHandler::new(state.pool)
        .apply_payment_event(
            &request.order_id,
            event_status,
            request.transaction_hash.as_deref(),
        )
        .await?;

    Ok(Json(WebhookResponse {
        applied: outcome.applied,
        order_status: outcome.order_status.to_string(),
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_adjust_request_parsing() {
        let json = r#"{"type": "withdrawal", "amount": "25.00"}"#;
        let request: WalletAdjustRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.adjust_type, AdjustmentType::Withdrawal);
        assert_eq!(request.amount, "25.00");
        assert!(request.description.is_none());
    }

    #[test]
    fn test_deposit_request_defaults_currency() {
        let json = r#"{"amount": "100"}"#;
        let request: CreateDepositRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.crypto_currency, "USDT");
    }

    #[test]
    fn test_loan_decision_request_variants() {
        let approve: LoanDecisionRequest = serde_json::from_str(
            r#"{"decision": "approve", "interest_rate": "10", "term_months": 12}"#,
        )
        .unwrap();
        assert!(matches!(approve, LoanDecisionRequest::Approve { .. }));

        let reject: LoanDecisionRequest =
            serde_json::from_str(r#"{"decision": "reject", "reason": "Income too low"}"#).unwrap();
        assert!(matches!(reject, LoanDecisionRequest::Reject { .. }));
    }

    #[test]
    fn test_webhook_request_parsing() {
        let json = r#"{"order_id": "order_abc", "status": "completed", "transaction_hash": "0xdeadbeef"}"#;
        let request: WebhookRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.order_id, "order_abc");
        assert_eq!(request.status, "completed");
        assert_eq!(request.transaction_hash.as_deref(), Some("0xdeadbeef"));
    }
}
