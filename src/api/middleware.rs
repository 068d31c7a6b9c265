//! API Middleware
//!
//! Builds the per-request `OperationContext` from the gateway-supplied
//! identity headers. Authentication itself is an external collaborator:
//! by the time a request reaches this service, the gateway has already
//! verified the session and attached the caller's identity.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;

/// Header carrying the gateway-authenticated user id
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the KYC approval flag ("true"/"false")
pub const KYC_APPROVED_HEADER: &str = "X-Kyc-Approved";

/// Header carrying a request correlation id
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Capture identity headers into an `OperationContext` request extension.
pub async fn context_middleware(
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let mut context = OperationContext::new();

    if let Some(user_id_str) = headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
        match Uuid::parse_str(user_id_str) {
            Ok(user_id) => {
                context = context.with_user(user_id);
            }
            Err(_) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Malformed X-User-Id header",
                        "error_code": "invalid_user_header"
                    })),
                )
                    .into_response());
            }
        }
    }

    let kyc_approved = headers
        .get(KYC_APPROVED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    context = context.with_kyc_approved(kyc_approved);

    if let Some(correlation) = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
    {
        context = context.with_correlation_id(correlation);
    }
    context.ensure_correlation_id();

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Extract the authenticated user from the context, rejecting anonymous
/// requests. Used by every user-scoped endpoint.
pub fn require_user(context: &OperationContext) -> Result<Uuid, AppError> {
    context.user_id.ok_or(AppError::MissingHeader(USER_ID_HEADER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_user_rejects_anonymous_context() {
        let context = OperationContext::new();
        assert!(require_user(&context).is_err());
    }

    #[test]
    fn test_require_user_accepts_identified_context() {
        let user_id = Uuid::new_v4();
        let context = OperationContext::new().with_user(user_id);
        assert_eq!(require_user(&context).unwrap(), user_id);
    }
}
