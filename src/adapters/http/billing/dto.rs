//! HTTP DTOs for billing endpoints.
//!
//! JSON field names are camelCase. Request fields default to empty so a
//! missing field reaches the handler and is reported as a validation error
//! naming that field.

use serde::{Deserialize, Serialize};

use crate::application::{CreateOrderResult, HandleGatewayWebhookResult};
use crate::domain::billing::SubscriptionView;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /payments/create-order` and `POST /payments/activate-free`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanSelectionRequest {
    pub plan_id: String,
}

/// Body of `POST /payments/verify`, as returned by the checkout widget.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub plan_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Order details for the checkout widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

impl From<CreateOrderResult> for CreateOrderResponse {
    fn from(result: CreateOrderResult) -> Self {
        Self {
            order_id: result.order_id,
            amount: result.amount_minor_units,
            currency: result.currency,
            key_id: result.key_id,
        }
    }
}

/// Subscription as shown to its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub plan_id: String,
    pub plan_name: String,
    pub plan_level: i32,
    pub status: String,
    /// ISO 8601.
    pub started_at: String,
    /// ISO 8601.
    pub expires_at: String,
    pub is_active: bool,
    pub days_remaining: i64,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            id: view.id.to_string(),
            plan_id: view.plan_id.as_str().to_string(),
            plan_name: view.plan_name,
            plan_level: view.plan_level,
            status: view.status.as_str().to_string(),
            started_at: view.started_at.as_datetime().to_rfc3339(),
            expires_at: view.expires_at.as_datetime().to_rfc3339(),
            is_active: view.is_active,
            days_remaining: view.days_remaining,
        }
    }
}

/// `{success: true, subscription}` for verify and free activation.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationResponse {
    pub success: bool,
    pub subscription: Option<SubscriptionResponse>,
}

impl ActivationResponse {
    pub fn new(subscription: Option<SubscriptionView>) -> Self {
        Self {
            success: true,
            subscription: subscription.map(SubscriptionResponse::from),
        }
    }
}

/// `{subscription}` where the value is null without an active subscription.
#[derive(Debug, Clone, Serialize)]
pub struct MySubscriptionResponse {
    pub subscription: Option<SubscriptionResponse>,
}

/// Webhook acknowledgement. The outcome is for logs and tests only.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    #[serde(skip)]
    pub outcome: Option<HandleGatewayWebhookResult>,
}

impl WebhookAckResponse {
    pub fn received(outcome: HandleGatewayWebhookResult) -> Self {
        Self {
            received: true,
            outcome: Some(outcome),
        }
    }
}

/// Error body shared by every billing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Subscription, SubscriptionStatus};
    use crate::domain::foundation::{PaymentId, PlanId, SubscriptionId, Timestamp, UserId};
    use serde_json::json;

    fn view() -> SubscriptionView {
        let now = Timestamp::now();
        let subscription = Subscription {
            id: SubscriptionId::new(),
            user_id: UserId::new("u1").unwrap(),
            plan_id: PlanId::new("basic").unwrap(),
            gateway_payment_id: Some("pay_1".to_string()),
            status: SubscriptionStatus::Active,
            started_at: now,
            expires_at: now.add_days(30),
            updated_at: now,
        };
        SubscriptionView::new(subscription, "Basic".to_string(), 1, now)
    }

    #[test]
    fn missing_request_fields_default_to_empty() {
        let request: VerifyPaymentRequest =
            serde_json::from_value(json!({ "gatewayOrderId": "order_1" })).unwrap();

        assert_eq!(request.gateway_order_id, "order_1");
        assert!(request.gateway_payment_id.is_empty());
        assert!(request.signature.is_empty());
    }

    #[test]
    fn create_order_response_is_camel_case() {
        let response = CreateOrderResponse::from(CreateOrderResult {
            payment_id: PaymentId::new(),
            order_id: "order_1".to_string(),
            amount_minor_units: 49900,
            currency: "INR".to_string(),
            key_id: "rzp_test_key".to_string(),
        });

        let value = serde_json::to_value(response).unwrap();

        assert_eq!(
            value,
            json!({ "orderId": "order_1", "amount": 49900, "currency": "INR", "keyId": "rzp_test_key" })
        );
    }

    #[test]
    fn activation_response_carries_subscription() {
        let value = serde_json::to_value(ActivationResponse::new(Some(view()))).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["subscription"]["planName"], "Basic");
        assert_eq!(value["subscription"]["isActive"], true);
        assert_eq!(value["subscription"]["daysRemaining"], 30);
        assert_eq!(value["subscription"]["status"], "active");
    }

    #[test]
    fn my_subscription_serializes_null() {
        let value = serde_json::to_value(MySubscriptionResponse { subscription: None }).unwrap();

        assert_eq!(value, json!({ "subscription": null }));
    }

    #[test]
    fn webhook_ack_hides_outcome() {
        let value =
            serde_json::to_value(WebhookAckResponse::received(HandleGatewayWebhookResult::Ignored))
                .unwrap();

        assert_eq!(value, json!({ "received": true }));
    }

    #[test]
    fn error_response_uses_error_code_key() {
        let value = serde_json::to_value(ErrorResponse::new("PLAN_NOT_FOUND", "nope")).unwrap();

        assert_eq!(value, json!({ "errorCode": "PLAN_NOT_FOUND", "message": "nope" }));
    }
}
