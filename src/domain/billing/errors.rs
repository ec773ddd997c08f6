//! Billing error taxonomy.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | ValidationFailed | 400 |
//! | PlanNotFound / InactivePlan | 404 |
//! | FreePlan | 400 |
//! | OrderNotFound | 404 |
//! | DuplicateOrder / PaymentConflict | 409 |
//! | InvalidPaymentSignature | 400 |
//! | InvalidWebhookSignature | 401 |
//! | MalformedPayload | 400 |
//! | DowngradeRejected | 400 |
//! | GatewayUnavailable | 500 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PlanId, ValidationError};

/// Errors surfaced by billing use cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    /// A request field is missing or malformed.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// The plan id does not resolve in the catalog.
    #[error("Plan not found: {0}")]
    PlanNotFound(PlanId),

    /// The plan exists but is not on sale.
    #[error("Plan is not available: {0}")]
    InactivePlan(PlanId),

    /// An order was requested for a plan that costs nothing.
    #[error("Plan {0} is free and does not require payment")]
    FreePlan(PlanId),

    /// No ledger entry exists for the gateway order id.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A ledger entry already exists for the gateway order id.
    #[error("Order already recorded: {0}")]
    DuplicateOrder(String),

    /// The order was already settled by a different gateway payment.
    #[error("Order {order_id} is already settled by another payment")]
    PaymentConflict { order_id: String },

    /// Client-submitted payment confirmation failed HMAC verification.
    #[error("Payment signature verification failed")]
    InvalidPaymentSignature,

    /// Gateway webhook failed HMAC verification.
    #[error("Webhook signature verification failed")]
    InvalidWebhookSignature,

    /// Body could not be parsed.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Caller holds an active paid subscription and asked for a free plan.
    #[error("An active paid subscription cannot be replaced by a free plan")]
    DowngradeRejected,

    /// The payment gateway failed or timed out.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Storage or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::validation(field, "is required")
    }

    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        BillingError::GatewayUnavailable(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            BillingError::PlanNotFound(_) => "PLAN_NOT_FOUND",
            BillingError::InactivePlan(_) => "PLAN_INACTIVE",
            BillingError::FreePlan(_) => "PLAN_IS_FREE",
            BillingError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            BillingError::DuplicateOrder(_) => "DUPLICATE_ORDER",
            BillingError::PaymentConflict { .. } => "PAYMENT_CONFLICT",
            BillingError::InvalidPaymentSignature => "SIGNATURE_INVALID",
            BillingError::InvalidWebhookSignature => "WEBHOOK_SIGNATURE_INVALID",
            BillingError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            BillingError::DowngradeRejected => "DOWNGRADE_REJECTED",
            BillingError::GatewayUnavailable(_) => "GATEWAY_ERROR",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to clients.
    ///
    /// Infrastructure and gateway details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            BillingError::GatewayUnavailable(_) => {
                "Payment gateway is unavailable, please try again later".to_string()
            }
            BillingError::Infrastructure(_) => {
                "An internal error occurred, please try again later".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BillingError::GatewayUnavailable(_) | BillingError::Infrastructure(_)
        )
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        let detail = |key: &str| err.detail(key).unwrap_or("unknown").to_string();
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: detail("field"),
                message: err.message.clone(),
            },
            ErrorCode::PlanNotFound => match PlanId::new(detail("plan_id")) {
                Ok(plan_id) => BillingError::PlanNotFound(plan_id),
                Err(_) => BillingError::Infrastructure(err.to_string()),
            },
            ErrorCode::OrderNotFound => BillingError::OrderNotFound(detail("gateway_order_id")),
            ErrorCode::DuplicateOrder => BillingError::DuplicateOrder(detail("gateway_order_id")),
            ErrorCode::PaymentConflict => BillingError::PaymentConflict {
                order_id: detail("gateway_order_id"),
            },
            ErrorCode::GatewayError => BillingError::GatewayUnavailable(err.message.clone()),
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                BillingError::Infrastructure(err.to_string())
            }
        }
    }
}
