//! CreateOrderHandler - Command handler for opening a gateway order for a paid plan.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{BillingError, PaymentRecord};
use crate::domain::foundation::{PaymentId, PlanId, UserId};
use crate::ports::{CreateOrderRequest, PaymentGateway, PaymentLedger, PlanCatalog};

/// Command to open an order for a plan.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    pub user_id: UserId,
    pub plan_id: String,
}

/// Details the client needs to start checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderResult {
    pub payment_id: PaymentId,
    pub order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    /// Public gateway key id. Never the secret.
    pub key_id: String,
}

/// Handler for order creation.
///
/// The ledger entry is written only after the gateway confirms the order, so
/// a gateway failure leaves no orphaned `created` row.
pub struct CreateOrderHandler {
    plans: Arc<dyn PlanCatalog>,
    ledger: Arc<dyn PaymentLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CreateOrderHandler {
    pub fn new(
        plans: Arc<dyn PlanCatalog>,
        ledger: Arc<dyn PaymentLedger>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            plans,
            ledger,
            gateway,
        }
    }

    pub async fn handle(&self, cmd: CreateOrderCommand) -> Result<CreateOrderResult, BillingError> {
        // 1. Resolve plan
        let plan_id =
            PlanId::new(cmd.plan_id.trim()).map_err(|_| BillingError::missing_field("planId"))?;
        let plan = self
            .plans
            .find_by_id(&plan_id)
            .await?
            .ok_or_else(|| BillingError::PlanNotFound(plan_id.clone()))?;

        if !plan.is_active {
            return Err(BillingError::InactivePlan(plan.id));
        }
        if plan.is_free() {
            return Err(BillingError::FreePlan(plan.id));
        }

        // 2. Open gateway order
        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount_minor_units: plan.price_minor_units,
                currency: plan.currency.clone(),
                receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
                plan_id: plan.id.clone(),
                user_id: cmd.user_id.clone(),
            })
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %cmd.user_id,
                    plan_id = %plan.id,
                    error = %e,
                    "Gateway order creation failed"
                );
                BillingError::gateway_unavailable(e.to_string())
            })?;

        // 3. Record pending payment
        let record = PaymentRecord::create_pending(
            cmd.user_id.clone(),
            plan.id.clone(),
            order.id.clone(),
            plan.price_minor_units,
            plan.currency.clone(),
        )?;
        self.ledger.create_pending(&record).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %cmd.user_id,
            plan_id = %plan.id,
            amount = plan.price_minor_units,
            "Order created"
        );

        Ok(CreateOrderResult {
            payment_id: record.id,
            order_id: order.id,
            amount_minor_units: order.amount_minor_units,
            currency: order.currency,
            key_id: self.gateway.key_id().to_string(),
        })
    }
}
