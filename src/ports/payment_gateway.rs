//! Payment gateway port for opening orders.
//!
//! The gateway itself is a black box: it opens orders, runs checkout in the
//! client, and later pushes signed webhooks. Only order creation is called
//! from the server side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{PlanId, UserId};

/// Port for the payment gateway's order API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an order for the given amount.
    ///
    /// Implementations must bound the call with a timeout.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Public key id handed to the client for checkout. Never the secret.
    fn key_id(&self) -> &str;
}

/// Request to open a gateway order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    /// Merchant reference, at most 40 characters.
    pub receipt: String,
    /// Correlation notes echoed back in webhooks.
    pub plan_id: PlanId,
    pub user_id: UserId,
}

/// An order opened at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub receipt: Option<String>,
}

/// Gateway call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,

    #[error("gateway unreachable: {0}")]
    Network(String),

    #[error("gateway rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}
