//! HandleGatewayWebhookHandler - Command handler for gateway-pushed events.
//!
//! Any response other than success makes the gateway redeliver. Only a
//! missing or wrong signature, malformed JSON or a storage failure are
//! errors; everything else is acknowledged.

use std::sync::Arc;

use crate::domain::billing::{BillingError, GatewayEvent, GatewaySignatureVerifier};
use crate::ports::PaymentLedger;

use super::{PaymentProcessor, ProcessOutcome};

/// Command to handle a webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Exact request bytes as received.
    pub raw_body: Vec<u8>,
    /// Signature header value, if present.
    pub signature: Option<String>,
}

/// What the webhook led to. Every variant is acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleGatewayWebhookResult {
    /// The payment was settled and the subscription activated.
    Activated {
        order_id: String,
        payment_id: String,
    },
    /// The payment had already been processed.
    AlreadyProcessed,
    /// Event type this service does not act on.
    Ignored,
    /// Captured payment without identifiers or correlation notes.
    Incomplete,
    /// Captured payment that does not match any order in the ledger.
    Unmatched,
}

pub struct HandleGatewayWebhookHandler {
    ledger: Arc<dyn PaymentLedger>,
    processor: Arc<PaymentProcessor>,
    verifier: Arc<GatewaySignatureVerifier>,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        processor: Arc<PaymentProcessor>,
        verifier: Arc<GatewaySignatureVerifier>,
    ) -> Self {
        Self {
            ledger,
            processor,
            verifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayWebhookCommand,
    ) -> Result<HandleGatewayWebhookResult, BillingError> {
        // 1. Signature over the raw bytes
        let signature = cmd
            .signature
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BillingError::missing_field("X-Razorpay-Signature"))?;

        if !self.verifier.verify_webhook(&cmd.raw_body, signature) {
            tracing::warn!(body_len = cmd.raw_body.len(), "Webhook signature rejected");
            return Err(BillingError::InvalidWebhookSignature);
        }

        // 2. Parse
        let payment = match GatewayEvent::parse(&cmd.raw_body)? {
            GatewayEvent::PaymentCaptured(payment) => payment,
            GatewayEvent::Ignored { event } => {
                tracing::debug!(event = %event, "Ignoring webhook event");
                return Ok(HandleGatewayWebhookResult::Ignored);
            }
            GatewayEvent::Incomplete { missing } => {
                tracing::warn!(missing = missing, "Captured payment webhook is incomplete");
                return Ok(HandleGatewayWebhookResult::Incomplete);
            }
        };

        // 3. Idempotency probe
        if self
            .processor
            .find_settled(&payment.gateway_payment_id)
            .await?
            .is_some()
        {
            tracing::info!(
                payment_id = %payment.gateway_payment_id,
                "Webhook for already processed payment"
            );
            return Ok(HandleGatewayWebhookResult::AlreadyProcessed);
        }

        // 4. Correlate with the ledger
        let order = match self.ledger.find_by_order_id(&payment.gateway_order_id).await? {
            Some(order) if order.belongs_to(&payment.user_id) && order.plan_id == payment.plan_id => {
                order
            }
            Some(_) => {
                tracing::warn!(
                    order_id = %payment.gateway_order_id,
                    user_id = %payment.user_id,
                    plan_id = %payment.plan_id,
                    "Webhook notes do not match the recorded order"
                );
                return Ok(HandleGatewayWebhookResult::Unmatched);
            }
            None => {
                tracing::warn!(
                    order_id = %payment.gateway_order_id,
                    payment_id = %payment.gateway_payment_id,
                    "Webhook for unknown order"
                );
                return Ok(HandleGatewayWebhookResult::Unmatched);
            }
        };

        // 5. Mark paid and activate
        match self
            .processor
            .settle(&order, &payment.gateway_payment_id, None)
            .await
        {
            Ok(ProcessOutcome::Activated(_)) => Ok(HandleGatewayWebhookResult::Activated {
                order_id: payment.gateway_order_id,
                payment_id: payment.gateway_payment_id,
            }),
            Ok(ProcessOutcome::AlreadyProcessed) => Ok(HandleGatewayWebhookResult::AlreadyProcessed),
            Err(
                err @ (BillingError::PaymentConflict { .. }
                | BillingError::OrderNotFound(_)
                | BillingError::PlanNotFound(_)),
            ) => {
                tracing::warn!(
                    order_id = %payment.gateway_order_id,
                    payment_id = %payment.gateway_payment_id,
                    error = %err,
                    "Webhook payment cannot be applied"
                );
                Ok(HandleGatewayWebhookResult::Unmatched)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::*;
    use crate::domain::billing::sign_webhook;
    use serde_json::json;

    fn handler(fixture: &Fixture) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            Arc::new(fixture.store.clone()),
            fixture.processor.clone(),
            fixture.verifier.clone(),
        )
    }

    fn captured(order_id: &str, payment_id: &str, user_id: &str, plan: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "entity": "event",
            "event": "payment.captured",
            "payload": {"payment": {"entity": {
                "id": payment_id,
                "order_id": order_id,
                "amount": 49900,
                "currency": "INR",
                "notes": {"planId": plan, "userId": user_id}
            }}}
        }))
        .unwrap()
    }

    fn signed(body: Vec<u8>) -> HandleGatewayWebhookCommand {
        let signature = sign_webhook(&body, WEBHOOK_SECRET.as_bytes());
        HandleGatewayWebhookCommand {
            raw_body: body,
            signature: Some(signature),
        }
    }

    #[tokio::test]
    async fn captured_payment_activates() {
        let fixture = Fixture::new();
        fixture.pending_order("order_1", "u1", "basic").await;

        let result = handler(&fixture)
            .handle(signed(captured("order_1", "pay_1", "u1", "basic")))
            .await
            .unwrap();

        assert_eq!(
            result,
            HandleGatewayWebhookResult::Activated {
                order_id: "order_1".into(),
                payment_id: "pay_1".into()
            }
        );
        assert!(fixture.activator.current(&user("u1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_delivery_is_noop() {
        let fixture = Fixture::new();
        fixture.pending_order("order_1", "u1", "basic").await;
        let handler = handler(&fixture);
        handler
            .handle(signed(captured("order_1", "pay_1", "u1", "basic")))
            .await
            .unwrap();
        let before = fixture.activator.current(&user("u1")).await.unwrap().unwrap();

        let result = handler
            .handle(signed(captured("order_1", "pay_1", "u1", "basic")))
            .await
            .unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::AlreadyProcessed);
        let after = fixture.activator.current(&user("u1")).await.unwrap().unwrap();
        assert_eq!(before.expires_at, after.expires_at);
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let fixture = Fixture::new();
        let cmd = HandleGatewayWebhookCommand {
            raw_body: captured("order_1", "pay_1", "u1", "basic"),
            signature: None,
        };

        let err = handler(&fixture).handle(cmd).await.unwrap_err();

        assert!(matches!(err, BillingError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn wrong_signature_is_unauthorized() {
        let fixture = Fixture::new();
        let body = captured("order_1", "pay_1", "u1", "basic");
        let cmd = HandleGatewayWebhookCommand {
            signature: Some(sign_webhook(&body, b"not-the-secret")),
            raw_body: body,
        };

        let err = handler(&fixture).handle(cmd).await.unwrap_err();

        assert_eq!(err, BillingError::InvalidWebhookSignature);
    }

    #[tokio::test]
    async fn malformed_json_with_valid_signature_is_rejected() {
        let fixture = Fixture::new();

        let err = handler(&fixture)
            .handle(signed(b"{\"event\":".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn other_events_are_ignored() {
        let fixture = Fixture::new();
        let body = br#"{"event":"payment.failed","payload":{}}"#.to_vec();

        let result = handler(&fixture).handle(signed(body)).await.unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::Ignored);
    }

    #[tokio::test]
    async fn missing_notes_are_acknowledged() {
        let fixture = Fixture::new();
        let body = serde_json::to_vec(&json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_1", "order_id": "order_1", "notes": []}}}
        }))
        .unwrap();

        let result = handler(&fixture).handle(signed(body)).await.unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::Incomplete);
    }

    #[tokio::test]
    async fn unknown_order_is_acknowledged() {
        let fixture = Fixture::new();

        let result = handler(&fixture)
            .handle(signed(captured("order_x", "pay_1", "u1", "basic")))
            .await
            .unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::Unmatched);
        assert_eq!(fixture.store.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn notes_for_another_user_are_not_applied() {
        let fixture = Fixture::new();
        fixture.pending_order("order_1", "u1", "basic").await;

        let result = handler(&fixture)
            .handle(signed(captured("order_1", "pay_1", "u2", "basic")))
            .await
            .unwrap();

        assert_eq!(result, HandleGatewayWebhookResult::Unmatched);
        assert!(fixture.activator.current(&user("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn storage_failure_is_returned_for_redelivery() {
        let fixture = Fixture::new();
        fixture.pending_order("order_1", "u1", "basic").await;
        fixture.store.fail_writes(true);

        let err = handler(&fixture)
            .handle(signed(captured("order_1", "pay_1", "u1", "basic")))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
    }
}
