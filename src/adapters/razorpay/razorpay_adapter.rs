//! Razorpay payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Razorpay Orders API.
//!
//! # Security
//!
//! - HTTP basic auth with key id and key secret
//! - Secrets handled via `secrecy::SecretString`
//! - Every request is bounded by the client timeout
//!
//! # Configuration
//!
//! ```ignore
//! let config = RazorpayConfig::new("rzp_test_abc", key_secret)
//!     .with_timeout(Duration::from_secs(10));
//! let gateway = RazorpayGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};

const DEFAULT_API_BASE_URL: &str = "https://api.razorpay.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Razorpay API configuration.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id (rzp_live_... or rzp_test_...).
    key_id: String,
    key_secret: SecretString,
    /// Base URL for the API (default: https://api.razorpay.com).
    api_base_url: String,
    timeout: Duration,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: SecretString) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    #[serde(rename = "planId")]
    plan_id: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    description: Option<String>,
}

/// Razorpay gateway adapter.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http_client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/v1/orders", self.config.api_base_url)
    }
}

fn order_body(request: &CreateOrderRequest) -> OrderBody<'_> {
    OrderBody {
        amount: request.amount_minor_units,
        currency: &request.currency,
        receipt: &request.receipt,
        notes: OrderNotes {
            plan_id: request.plan_id.as_str(),
            user_id: request.user_id.as_str(),
        },
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Network(err.to_string())
    }
}

fn rejection(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<RazorpayErrorBody>(body)
        .ok()
        .and_then(|b| b.error.description)
        .unwrap_or_else(|| "no error description".to_string());
    GatewayError::Rejected { status, message }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .http_client
            .post(self.orders_url())
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.expose_secret()))
            .json(&order_body(&request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = rejection(status.as_u16(), &body);
            tracing::error!(status = status.as_u16(), error = %err, "Razorpay create_order failed");
            return Err(err);
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(GatewayOrder {
            id: order.id,
            amount_minor_units: order.amount,
            currency: order.currency,
            receipt: order.receipt,
        })
    }

    fn key_id(&self) -> &str {
        &self.config.key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{PlanId, UserId};

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            amount_minor_units: 49900,
            currency: "INR".to_string(),
            receipt: "rcpt_abc".to_string(),
            plan_id: PlanId::new("basic").unwrap(),
            user_id: UserId::new("u1").unwrap(),
        }
    }

    #[test]
    fn order_body_carries_notes() {
        let request = request();
        let json = serde_json::to_value(order_body(&request)).unwrap();

        assert_eq!(json["amount"], 49900);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["receipt"], "rcpt_abc");
        assert_eq!(json["notes"]["planId"], "basic");
        assert_eq!(json["notes"]["userId"], "u1");
    }

    #[test]
    fn order_response_parses() {
        let body = r#"{"id":"order_IluGWxBm9U8zJ8","entity":"order","amount":49900,
            "amount_paid":0,"currency":"INR","receipt":"rcpt_abc","status":"created"}"#;
        let order: RazorpayOrder = serde_json::from_str(body).unwrap();
        assert_eq!(order.id, "order_IluGWxBm9U8zJ8");
        assert_eq!(order.amount, 49900);
    }

    #[test]
    fn rejection_uses_gateway_description() {
        let body = r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"amount must be at least INR 1.00"}}"#;
        assert_eq!(
            rejection(400, body),
            GatewayError::Rejected {
                status: 400,
                message: "amount must be at least INR 1.00".to_string()
            }
        );
    }

    #[test]
    fn rejection_tolerates_non_json_body() {
        assert!(matches!(
            rejection(502, "<html>Bad Gateway</html>"),
            GatewayError::Rejected { status: 502, .. }
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = RazorpayConfig::new("rzp_test_x", SecretString::new("s".into()))
            .with_base_url("http://localhost:9999/");
        let gateway = RazorpayGateway::new(config).unwrap();
        assert_eq!(gateway.orders_url(), "http://localhost:9999/v1/orders");
        assert_eq!(gateway.key_id(), "rzp_test_x");
    }

    #[test]
    fn config_debug_hides_secret() {
        let config = RazorpayConfig::new("rzp_test_x", SecretString::new("very-secret".into()));
        assert!(!format!("{:?}", config).contains("very-secret"));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_network_error() {
        let config = RazorpayConfig::new("rzp_test_x", SecretString::new("s".into()))
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2));
        let gateway = RazorpayGateway::new(config).unwrap();

        let err = gateway.create_order(request()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Network(_) | GatewayError::Timeout));
    }
}
