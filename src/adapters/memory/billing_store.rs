//! In-Memory Billing Store
//!
//! Implements every billing storage port over one lock, so each operation
//! is atomic with respect to the others. Semantics mirror the Postgres
//! adapters. Useful for testing and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{
    order_not_found, ActivationRequest, MarkPaidOutcome, PaymentRecord, Plan, Subscription,
};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId, Timestamp, UserId};
use crate::ports::{
    PaymentLedger, PaymentSettlement, PlanCatalog, Settlement, SettlementOutcome,
    SubscriptionRepository,
};

#[derive(Debug, Default)]
struct BillingState {
    plans: HashMap<PlanId, Plan>,
    /// Keyed by gateway order id.
    payments: HashMap<String, PaymentRecord>,
    /// Keyed by user.
    subscriptions: HashMap<UserId, Subscription>,
}

impl BillingState {
    fn paid_by(&self, gateway_payment_id: &str) -> Option<&PaymentRecord> {
        self.payments.values().find(|p| {
            p.is_paid() && p.gateway_payment_id.as_deref() == Some(gateway_payment_id)
        })
    }

    fn holds_active_paid_plan(&self, user_id: &UserId, now: Timestamp) -> bool {
        let Some(current) = self.subscriptions.get(user_id) else {
            return false;
        };
        if !current.is_active_at(now) {
            return false;
        }
        match self.plans.get(&current.plan_id) {
            Some(plan) => plan.is_paid(),
            None => current.gateway_payment_id.is_some(),
        }
    }

    fn activate(&mut self, request: &ActivationRequest, now: Timestamp) -> Subscription {
        let next = Subscription::activate(self.subscriptions.get(&request.user_id), request, now);
        self.subscriptions
            .insert(request.user_id.clone(), next.clone());
        next
    }
}

/// In-memory storage for plans, payments and subscriptions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    state: Arc<RwLock<BillingState>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given catalog.
    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let state = BillingState {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..BillingState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            fail_writes: Arc::default(),
        }
    }

    pub async fn insert_plan(&self, plan: Plan) {
        self.state.write().await.plans.insert(plan.id.clone(), plan);
    }

    /// Overwrite a user's subscription row directly (test setup).
    pub async fn put_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.user_id.clone(), subscription);
    }

    /// Make every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subscriptions.len()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::database("simulated write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PlanCatalog for InMemoryBillingStore {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.state.read().await.plans.get(id).cloned())
    }
}

#[async_trait]
impl PaymentLedger for InMemoryBillingStore {
    async fn create_pending(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        if state.payments.contains_key(&record.gateway_order_id) {
            return Err(
                DomainError::new(ErrorCode::DuplicateOrder, "Order already recorded")
                    .with_detail("gateway_order_id", record.gateway_order_id.clone()),
            );
        }
        state
            .payments
            .insert(record.gateway_order_id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.state.read().await.payments.get(gateway_order_id).cloned())
    }

    async fn find_paid_by_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.state.read().await.paid_by(gateway_payment_id).cloned())
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: Option<&str>,
    ) -> Result<MarkPaidOutcome, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let record = state
            .payments
            .get_mut(gateway_order_id)
            .ok_or_else(|| order_not_found(gateway_order_id))?;
        record.mark_paid(gateway_payment_id, signature, Timestamp::now())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.state.read().await.subscriptions.get(user_id).cloned())
    }

    async fn activate(&self, request: &ActivationRequest) -> Result<Subscription, DomainError> {
        self.check_writable()?;
        Ok(self.state.write().await.activate(request, Timestamp::now()))
    }

    async fn activate_unless_paid(
        &self,
        request: &ActivationRequest,
    ) -> Result<Option<Subscription>, DomainError> {
        self.check_writable()?;
        let now = Timestamp::now();
        let mut state = self.state.write().await;
        if state.holds_active_paid_plan(&request.user_id, now) {
            return Ok(None);
        }
        Ok(Some(state.activate(request, now)))
    }
}

#[async_trait]
impl PaymentSettlement for InMemoryBillingStore {
    async fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError> {
        self.check_writable()?;
        let now = Timestamp::now();
        let mut state = self.state.write().await;

        // Work on a copy so a failure leaves the ledger untouched.
        let mut record = state
            .payments
            .get(&settlement.gateway_order_id)
            .cloned()
            .ok_or_else(|| order_not_found(&settlement.gateway_order_id))?;

        match record.mark_paid(
            &settlement.gateway_payment_id,
            settlement.signature.as_deref(),
            now,
        )? {
            MarkPaidOutcome::AlreadyPaid => Ok(SettlementOutcome::AlreadySettled),
            MarkPaidOutcome::Transitioned => {
                state
                    .payments
                    .insert(settlement.gateway_order_id.clone(), record);
                let subscription = state.activate(&settlement.activation, now);
                Ok(SettlementOutcome::Settled(subscription))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PaymentStatus;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn plan_id(id: &str) -> PlanId {
        PlanId::new(id).unwrap()
    }

    fn basic_plan() -> Plan {
        Plan::new(plan_id("basic"), "Basic", 1, 49900, "INR", 30).unwrap()
    }

    fn pending(order_id: &str) -> PaymentRecord {
        PaymentRecord::create_pending(user("u1"), plan_id("basic"), order_id, 49900, "INR")
            .unwrap()
    }

    fn settlement(order_id: &str, payment_id: &str) -> Settlement {
        Settlement {
            gateway_order_id: order_id.to_string(),
            gateway_payment_id: payment_id.to_string(),
            signature: Some("sig".to_string()),
            activation: ActivationRequest::new(
                user("u1"),
                plan_id("basic"),
                Some(payment_id.to_string()),
                30,
            )
            .unwrap(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Catalog
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn seeded_plans_resolve() {
        let store = InMemoryBillingStore::with_plans([basic_plan()]);
        assert!(store.find_by_id(&plan_id("basic")).await.unwrap().is_some());
        assert!(store.find_by_id(&plan_id("pro")).await.unwrap().is_none());
    }

    // ══════════════════════════════════════════════════════════════
    // Ledger
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_order_is_rejected() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();

        let err = store.create_pending(&pending("order_1")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DuplicateOrder);
        assert_eq!(store.payment_count().await, 1);
    }

    #[tokio::test]
    async fn mark_paid_unknown_order_is_not_found() {
        let store = InMemoryBillingStore::new();
        let err = store.mark_paid("order_x", "pay_1", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn paid_entry_is_found_by_payment_id() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();
        assert!(store.find_paid_by_payment_id("pay_1").await.unwrap().is_none());

        store.mark_paid("order_1", "pay_1", Some("sig")).await.unwrap();

        let found = store.find_paid_by_payment_id("pay_1").await.unwrap().unwrap();
        assert_eq!(found.status, PaymentStatus::Paid);
        assert_eq!(found.gateway_order_id, "order_1");
    }

    // ══════════════════════════════════════════════════════════════
    // Settlement
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn settle_marks_paid_and_activates() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();

        let outcome = store.settle(&settlement("order_1", "pay_1")).await.unwrap();

        assert!(matches!(outcome, SettlementOutcome::Settled(_)));
        assert!(store.find_paid_by_payment_id("pay_1").await.unwrap().is_some());
        assert_eq!(store.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn second_settle_does_not_extend_again() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();
        store.settle(&settlement("order_1", "pay_1")).await.unwrap();
        let first = store.find_by_user(&user("u1")).await.unwrap().unwrap();

        let outcome = store.settle(&settlement("order_1", "pay_1")).await.unwrap();

        assert_eq!(outcome, SettlementOutcome::AlreadySettled);
        let after = store.find_by_user(&user("u1")).await.unwrap().unwrap();
        assert_eq!(after.expires_at, first.expires_at);
    }

    #[tokio::test]
    async fn settle_with_other_payment_conflicts() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();
        store.settle(&settlement("order_1", "pay_1")).await.unwrap();

        let err = store.settle(&settlement("order_1", "pay_2")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::PaymentConflict);
    }

    #[tokio::test]
    async fn failed_settle_leaves_state_untouched() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();
        store.fail_writes(true);

        assert!(store.settle(&settlement("order_1", "pay_1")).await.is_err());

        store.fail_writes(false);
        let record = store.find_by_order_id("order_1").await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Created);
        assert_eq!(store.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_settles_activate_once() {
        let store = InMemoryBillingStore::new();
        store.create_pending(&pending("order_1")).await.unwrap();

        let tasks = (0..8).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.settle(&settlement("order_1", "pay_1")).await })
        });
        let results = futures::future::join_all(tasks).await;

        let settled = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .filter(|o| matches!(o, SettlementOutcome::Settled(_)))
            .count();
        assert_eq!(settled, 1);
    }

    // ══════════════════════════════════════════════════════════════
    // Subscriptions
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn activation_keeps_one_row_per_user() {
        let store = InMemoryBillingStore::new();
        let first = ActivationRequest::new(user("u1"), plan_id("basic"), None, 30).unwrap();
        let second = ActivationRequest::new(user("u1"), plan_id("pro"), None, 30).unwrap();

        let a = store.activate(&first).await.unwrap();
        let b = store.activate(&second).await.unwrap();

        assert_eq!(store.subscription_count().await, 1);
        assert_eq!(a.id, b.id);
        assert_eq!(b.plan_id, plan_id("pro"));
        assert!(b.expires_at.is_after(&a.expires_at));
    }

    #[tokio::test]
    async fn guarded_activation_leaves_active_paid_row_alone() {
        let store = InMemoryBillingStore::with_plans([
            basic_plan(),
            Plan::new(plan_id("free"), "Free", 0, 0, "INR", 30).unwrap(),
        ]);
        let paid = ActivationRequest::new(user("u1"), plan_id("basic"), Some("pay_1".into()), 30)
            .unwrap();
        let free = ActivationRequest::new(user("u1"), plan_id("free"), None, 30).unwrap();
        store.activate(&paid).await.unwrap();

        let result = store.activate_unless_paid(&free).await.unwrap();

        assert!(result.is_none());
        let row = store.find_by_user(&user("u1")).await.unwrap().unwrap();
        assert_eq!(row.plan_id, plan_id("basic"));
    }

    #[tokio::test]
    async fn guarded_activation_extends_free_row() {
        let store = InMemoryBillingStore::with_plans([
            Plan::new(plan_id("free"), "Free", 0, 0, "INR", 30).unwrap(),
        ]);
        let free = ActivationRequest::new(user("u1"), plan_id("free"), None, 30).unwrap();

        let first = store.activate_unless_paid(&free).await.unwrap().unwrap();
        let second = store.activate_unless_paid(&free).await.unwrap().unwrap();

        assert_eq!(second.expires_at, first.expires_at.add_days(30));
    }
}
