//! Operation Context
//!
//! Metadata about the current operation, supplied by the external gateway.
//! Identity and the KYC approval flag are collaborator inputs; this core
//! never authenticates anyone itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, used for gating, auditing and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Authenticated user, from the X-User-Id header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// KYC approval flag forwarded by the gateway
    #[serde(default)]
    pub kyc_approved: bool,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self {
            user_id: None,
            kyc_approved: false,
            correlation_id: None,
        }
    }

    /// Context with an authenticated user
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Context with the KYC approval flag set
    pub fn with_kyc_approved(mut self, approved: bool) -> Self {
        self.kyc_approved = approved;
        self
    }

    /// Context with a correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
