//! ActivateFreePlanHandler - Command handler for activating a zero-price plan.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionView};
use crate::domain::foundation::{PlanId, UserId};
use crate::ports::PlanCatalog;

use super::SubscriptionActivator;

/// Command to activate a free plan.
#[derive(Debug, Clone)]
pub struct ActivateFreePlanCommand {
    pub user_id: UserId,
    pub plan_id: String,
}

/// Handler for free-plan activation.
///
/// No ledger entry is written since no money changes hands. A caller with an
/// active paid subscription cannot switch to a free plan this way; the check
/// runs inside the same atomic write as the activation, so a payment settling
/// concurrently is never overwritten.
pub struct ActivateFreePlanHandler {
    plans: Arc<dyn PlanCatalog>,
    activator: Arc<SubscriptionActivator>,
}

impl ActivateFreePlanHandler {
    pub fn new(plans: Arc<dyn PlanCatalog>, activator: Arc<SubscriptionActivator>) -> Self {
        Self { plans, activator }
    }

    pub async fn handle(&self, cmd: ActivateFreePlanCommand) -> Result<SubscriptionView, BillingError> {
        let plan_id = PlanId::new(cmd.plan_id.trim())
            .map_err(|_| BillingError::missing_field("planId"))?;

        // 1. Plan must exist, be on sale and cost nothing
        let plan = self
            .plans
            .find_by_id(&plan_id)
            .await?
            .filter(|plan| plan.is_free())
            .ok_or_else(|| BillingError::PlanNotFound(plan_id.clone()))?;
        if !plan.is_active {
            return Err(BillingError::InactivePlan(plan.id));
        }

        // 2. Activate, unless on an active paid plan
        match self.activator.activate_unless_paid(&cmd.user_id, &plan.id).await? {
            Some(view) => Ok(view),
            None => {
                tracing::info!(
                    user_id = %cmd.user_id,
                    plan_id = %plan.id,
                    "Free plan activation rejected for paid subscriber"
                );
                Err(BillingError::DowngradeRejected)
            }
        }
    }
}
