//! Shared fixtures for billing handler tests.

use std::sync::Arc;

use secrecy::SecretString;

use crate::adapters::memory::InMemoryBillingStore;
use crate::adapters::razorpay::MockPaymentGateway;
use crate::domain::billing::{
    GatewaySignatureVerifier, PaymentRecord, Plan, Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, UserId};
use crate::ports::PaymentLedger;

use super::{PaymentProcessor, SubscriptionActivator};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn plan_id(id: &str) -> PlanId {
    PlanId::new(id).unwrap()
}

pub fn catalog() -> Vec<Plan> {
    vec![
        Plan::new(plan_id("free"), "Free", 0, 0, "INR", 30).unwrap(),
        Plan::new(plan_id("basic"), "Basic", 1, 49900, "INR", 30).unwrap(),
        Plan::new(plan_id("pro"), "Pro", 2, 99900, "INR", 30).unwrap(),
        Plan::new(plan_id("legacy"), "Legacy", 1, 19900, "INR", 30)
            .unwrap()
            .deactivated(),
    ]
}

pub fn active_subscription(user_id: &str, plan: &str, days_left: i64) -> Subscription {
    let now = Timestamp::now();
    Subscription {
        id: SubscriptionId::new(),
        user_id: user(user_id),
        plan_id: plan_id(plan),
        gateway_payment_id: Some("pay_existing".to_string()),
        status: SubscriptionStatus::Active,
        started_at: now.minus_days(1),
        expires_at: now.add_days(days_left),
        updated_at: now.minus_days(1),
    }
}

pub fn expired_subscription(user_id: &str, plan: &str) -> Subscription {
    let now = Timestamp::now();
    Subscription {
        expires_at: now.minus_days(2),
        started_at: now.minus_days(32),
        ..active_subscription(user_id, plan, 0)
    }
}

pub struct Fixture {
    pub store: InMemoryBillingStore,
    pub gateway: Arc<MockPaymentGateway>,
    pub verifier: Arc<GatewaySignatureVerifier>,
    pub processor: Arc<PaymentProcessor>,
    pub activator: Arc<SubscriptionActivator>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryBillingStore::with_plans(catalog());
        let shared = Arc::new(store.clone());
        Self {
            gateway: Arc::new(MockPaymentGateway::new(KEY_ID)),
            verifier: Arc::new(GatewaySignatureVerifier::new(
                SecretString::new(KEY_SECRET.to_string()),
                SecretString::new(WEBHOOK_SECRET.to_string()),
            )),
            processor: Arc::new(PaymentProcessor::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
            )),
            activator: Arc::new(SubscriptionActivator::new(shared.clone(), shared)),
            store,
        }
    }

    /// Records a created order without going through the gateway.
    pub async fn pending_order(&self, order_id: &str, user_id: &str, plan: &str) -> PaymentRecord {
        let record =
            PaymentRecord::create_pending(user(user_id), plan_id(plan), order_id, 49900, "INR")
                .unwrap();
        self.store.create_pending(&record).await.unwrap();
        record
    }
}
