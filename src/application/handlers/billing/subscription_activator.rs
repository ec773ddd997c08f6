//! SubscriptionActivator - creates, extends and reads the per-user entitlement.

use std::sync::Arc;

use crate::domain::billing::{ActivationRequest, BillingError, Plan, Subscription, SubscriptionView};
use crate::domain::foundation::{PlanId, Timestamp, UserId};
use crate::ports::{PlanCatalog, SubscriptionRepository};

/// Application service around the subscription row.
///
/// Activation resolves the plan for its duration and joins the result with
/// plan name and level for the client.
pub struct SubscriptionActivator {
    plans: Arc<dyn PlanCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionActivator {
    pub fn new(
        plans: Arc<dyn PlanCatalog>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            plans,
            subscriptions,
        }
    }

    /// Activates `plan_id` for the user, extending any active window.
    ///
    /// Calling twice with the same payment extends twice; callers guard
    /// against that with the ledger's idempotency probe.
    pub async fn activate(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
        gateway_payment_id: Option<String>,
    ) -> Result<SubscriptionView, BillingError> {
        let plan = self.resolve(plan_id).await?;
        let request = ActivationRequest::new(
            user_id.clone(),
            plan.id.clone(),
            gateway_payment_id,
            plan.duration_days,
        )?;
        let subscription = self.subscriptions.activate(&request).await?;

        tracing::info!(
            user_id = %user_id,
            plan_id = %plan.id,
            expires_at = %subscription.expires_at.as_datetime(),
            "Subscription activated"
        );

        Ok(SubscriptionView::new(
            subscription,
            plan.name,
            plan.level,
            Timestamp::now(),
        ))
    }

    /// Activates `plan_id` unless the user holds an active paid subscription,
    /// in which case nothing is written and `None` is returned.
    pub async fn activate_unless_paid(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
    ) -> Result<Option<SubscriptionView>, BillingError> {
        let plan = self.resolve(plan_id).await?;
        let request =
            ActivationRequest::new(user_id.clone(), plan.id.clone(), None, plan.duration_days)?;
        let Some(subscription) = self.subscriptions.activate_unless_paid(&request).await? else {
            return Ok(None);
        };

        tracing::info!(
            user_id = %user_id,
            plan_id = %plan.id,
            expires_at = %subscription.expires_at.as_datetime(),
            "Subscription activated"
        );

        Ok(Some(SubscriptionView::new(
            subscription,
            plan.name,
            plan.level,
            Timestamp::now(),
        )))
    }

    /// The user's subscription if it is currently active.
    pub async fn current(&self, user_id: &UserId) -> Result<Option<SubscriptionView>, BillingError> {
        let now = Timestamp::now();
        match self.subscriptions.find_by_user(user_id).await? {
            Some(subscription) if subscription.is_active_at(now) => {
                Ok(Some(self.view(subscription, now).await?))
            }
            _ => Ok(None),
        }
    }

    /// Joins a row with its plan. A plan missing from the catalog is shown
    /// by id with level zero.
    pub async fn view(
        &self,
        subscription: Subscription,
        now: Timestamp,
    ) -> Result<SubscriptionView, BillingError> {
        let (name, level) = match self.plans.find_by_id(&subscription.plan_id).await? {
            Some(plan) => (plan.name, plan.level),
            None => (subscription.plan_id.to_string(), 0),
        };
        Ok(SubscriptionView::new(subscription, name, level, now))
    }

    async fn resolve(&self, plan_id: &PlanId) -> Result<Plan, BillingError> {
        self.plans
            .find_by_id(plan_id)
            .await?
            .ok_or_else(|| BillingError::PlanNotFound(plan_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::*;

    #[tokio::test]
    async fn activate_unknown_plan_fails() {
        let fixture = Fixture::new();

        let err = fixture
            .activator
            .activate(&user("u1"), &plan_id("gold"), None)
            .await
            .unwrap_err();

        assert_eq!(err, BillingError::PlanNotFound(plan_id("gold")));
    }

    #[tokio::test]
    async fn activate_uses_plan_duration_and_joins_plan() {
        let fixture = Fixture::new();

        let view = fixture
            .activator
            .activate(&user("u1"), &plan_id("basic"), Some("pay_123".into()))
            .await
            .unwrap();

        assert_eq!(view.plan_name, "Basic");
        assert!(view.is_active);
        assert_eq!(view.days_remaining, 30);
        assert_eq!(view.gateway_payment_id.as_deref(), Some("pay_123"));
    }

    #[tokio::test]
    async fn second_activation_before_expiry_stacks_time() {
        let fixture = Fixture::new();
        let first = fixture
            .activator
            .activate(&user("u1"), &plan_id("basic"), Some("pay_123".into()))
            .await
            .unwrap();

        let second = fixture
            .activator
            .activate(&user("u1"), &plan_id("pro"), Some("pay_456".into()))
            .await
            .unwrap();

        assert_eq!(second.plan_id, plan_id("pro"));
        assert_eq!(second.expires_at, first.expires_at.add_days(30));
        assert_eq!(fixture.store.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn current_hides_expired_subscription() {
        let fixture = Fixture::new();
        fixture
            .store
            .put_subscription(expired_subscription("u1", "basic"))
            .await;

        assert!(fixture.activator.current(&user("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_activations_leave_one_row() {
        let fixture = Fixture::new();
        let activator = fixture.activator.clone();

        let a = {
            let activator = activator.clone();
            tokio::spawn(async move {
                activator
                    .activate(&user("u1"), &plan_id("basic"), Some("pay_a".into()))
                    .await
            })
        };
        let b = tokio::spawn(async move {
            activator
                .activate(&user("u1"), &plan_id("pro"), Some("pay_b".into()))
                .await
        });
        let results = futures::future::join_all([a, b]).await;
        assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

        assert_eq!(fixture.store.subscription_count().await, 1);
        let row = fixture.activator.current(&user("u1")).await.unwrap().unwrap();
        assert!(
            (row.plan_id == plan_id("basic") && row.gateway_payment_id.as_deref() == Some("pay_a"))
                || (row.plan_id == plan_id("pro")
                    && row.gateway_payment_id.as_deref() == Some("pay_b"))
        );
        assert_eq!(row.days_remaining, 60);
    }
}
