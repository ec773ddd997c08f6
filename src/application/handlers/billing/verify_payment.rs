//! VerifyPaymentHandler - Command handler for client-submitted checkout confirmations.

use std::sync::Arc;

use crate::domain::billing::{BillingError, GatewaySignatureVerifier, SubscriptionView};
use crate::domain::foundation::{PlanId, UserId};
use crate::ports::PaymentLedger;

use super::{PaymentProcessor, ProcessOutcome, SubscriptionActivator};

/// Command carrying the gateway's checkout callback fields.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub user_id: UserId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
    pub plan_id: String,
}

/// Result of verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPaymentResult {
    /// The caller's subscription after processing.
    pub subscription: Option<SubscriptionView>,
    /// True when the payment had already been processed.
    pub replayed: bool,
}

/// Handler for checkout confirmations.
///
/// The HMAC signature is the only proof of payment; amount and currency are
/// not re-checked against the gateway.
pub struct VerifyPaymentHandler {
    ledger: Arc<dyn PaymentLedger>,
    processor: Arc<PaymentProcessor>,
    activator: Arc<SubscriptionActivator>,
    verifier: Arc<GatewaySignatureVerifier>,
}

impl VerifyPaymentHandler {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        processor: Arc<PaymentProcessor>,
        activator: Arc<SubscriptionActivator>,
        verifier: Arc<GatewaySignatureVerifier>,
    ) -> Self {
        Self {
            ledger,
            processor,
            activator,
            verifier,
        }
    }

    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<VerifyPaymentResult, BillingError> {
        let order_id = required("gatewayOrderId", &cmd.gateway_order_id)?;
        let payment_id = required("gatewayPaymentId", &cmd.gateway_payment_id)?;
        let signature = required("signature", &cmd.signature)?;
        let plan_id = PlanId::new(cmd.plan_id.trim())
            .map_err(|_| BillingError::missing_field("planId"))?;

        // 1. Idempotency probe
        if let Some(paid) = self.processor.find_settled(payment_id).await? {
            if !paid.belongs_to(&cmd.user_id) {
                tracing::warn!(
                    payment_id = %payment_id,
                    user_id = %cmd.user_id,
                    "Payment settled for a different user"
                );
                return Err(BillingError::OrderNotFound(order_id.to_string()));
            }
            tracing::info!(payment_id = %payment_id, user_id = %cmd.user_id, "Replayed verification");
            return self.replay(&cmd.user_id).await;
        }

        // 2. Signature
        if !self.verifier.verify_payment(order_id, payment_id, signature) {
            tracing::warn!(
                order_id = %order_id,
                payment_id = %payment_id,
                user_id = %cmd.user_id,
                "Payment signature rejected"
            );
            return Err(BillingError::InvalidPaymentSignature);
        }

        // 3. Ledger cross-check
        let order = self
            .ledger
            .find_by_order_id(order_id)
            .await?
            .filter(|order| order.belongs_to(&cmd.user_id))
            .ok_or_else(|| {
                tracing::warn!(
                    order_id = %order_id,
                    user_id = %cmd.user_id,
                    "Verified payment for unknown order"
                );
                BillingError::OrderNotFound(order_id.to_string())
            })?;
        if order.plan_id != plan_id {
            return Err(BillingError::validation(
                "planId",
                "does not match the plan of the order",
            ));
        }

        // 4. Mark paid and activate
        match self.processor.settle(&order, payment_id, Some(signature)).await? {
            ProcessOutcome::Activated(view) => Ok(VerifyPaymentResult {
                subscription: Some(view),
                replayed: false,
            }),
            ProcessOutcome::AlreadyProcessed => self.replay(&cmd.user_id).await,
        }
    }

    async fn replay(&self, user_id: &UserId) -> Result<VerifyPaymentResult, BillingError> {
        Ok(VerifyPaymentResult {
            subscription: self.activator.current(user_id).await?,
            replayed: true,
        })
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, BillingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BillingError::missing_field(field));
    }
    Ok(trimmed)
}
