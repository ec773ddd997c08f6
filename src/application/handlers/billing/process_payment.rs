//! PaymentProcessor - the use case shared by client verification and webhooks.
//!
//! Both entry points probe for an earlier settlement first and then hand a
//! verified payment to `settle`, which marks the order paid and activates
//! the subscription atomically.

use std::sync::Arc;

use crate::domain::billing::{ActivationRequest, BillingError, PaymentRecord, SubscriptionView};
use crate::domain::foundation::Timestamp;
use crate::ports::{PaymentLedger, PaymentSettlement, PlanCatalog, Settlement, SettlementOutcome};

/// Result of processing a verified payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// This call settled the payment and activated the subscription.
    Activated(SubscriptionView),
    /// Another call settled the same payment first.
    AlreadyProcessed,
}

pub struct PaymentProcessor {
    ledger: Arc<dyn PaymentLedger>,
    plans: Arc<dyn PlanCatalog>,
    settlement: Arc<dyn PaymentSettlement>,
}

impl PaymentProcessor {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        plans: Arc<dyn PlanCatalog>,
        settlement: Arc<dyn PaymentSettlement>,
    ) -> Self {
        Self {
            ledger,
            plans,
            settlement,
        }
    }

    /// Idempotency probe. Must run before any mutating step.
    pub async fn find_settled(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, BillingError> {
        Ok(self.ledger.find_paid_by_payment_id(gateway_payment_id).await?)
    }

    /// Settles `order` with a verified gateway payment.
    ///
    /// The plan recorded on the order decides the activation window.
    pub async fn settle(
        &self,
        order: &PaymentRecord,
        gateway_payment_id: &str,
        signature: Option<&str>,
    ) -> Result<ProcessOutcome, BillingError> {
        let plan = self
            .plans
            .find_by_id(&order.plan_id)
            .await?
            .ok_or_else(|| BillingError::PlanNotFound(order.plan_id.clone()))?;

        let settlement = Settlement {
            gateway_order_id: order.gateway_order_id.clone(),
            gateway_payment_id: gateway_payment_id.to_string(),
            signature: signature.map(str::to_string),
            activation: ActivationRequest::new(
                order.user_id.clone(),
                plan.id.clone(),
                Some(gateway_payment_id.to_string()),
                plan.duration_days,
            )?,
        };

        match self.settlement.settle(&settlement).await {
            Ok(SettlementOutcome::Settled(subscription)) => {
                tracing::info!(
                    order_id = %order.gateway_order_id,
                    payment_id = %gateway_payment_id,
                    user_id = %order.user_id,
                    plan_id = %plan.id,
                    expires_at = %subscription.expires_at.as_datetime(),
                    "Payment settled and subscription activated"
                );
                Ok(ProcessOutcome::Activated(SubscriptionView::new(
                    subscription,
                    plan.name,
                    plan.level,
                    Timestamp::now(),
                )))
            }
            Ok(SettlementOutcome::AlreadySettled) => {
                tracing::info!(
                    order_id = %order.gateway_order_id,
                    payment_id = %gateway_payment_id,
                    "Payment already settled, skipping activation"
                );
                Ok(ProcessOutcome::AlreadyProcessed)
            }
            Err(e) => {
                let err = BillingError::from(e);
                if err.is_retryable() {
                    tracing::error!(
                        order_id = %order.gateway_order_id,
                        payment_id = %gateway_payment_id,
                        error = %err,
                        "Settlement failed"
                    );
                }
                Err(err)
            }
        }
    }
}
