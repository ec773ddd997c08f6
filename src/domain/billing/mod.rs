//! Billing domain: plans, the payment ledger entry, subscription
//! entitlement rules and gateway signature verification.

mod errors;
mod gateway_event;
mod payment;
mod plan;
mod signature;
mod subscription;

pub use errors::BillingError;
pub use gateway_event::{CapturedPayment, GatewayEvent, PAYMENT_CAPTURED};
pub use payment::{order_not_found, payment_conflict, MarkPaidOutcome, PaymentRecord, PaymentStatus};
pub use plan::{Plan, MAX_DURATION_DAYS};
pub use signature::{
    sign_payment, sign_webhook, verify_payment_signature, verify_webhook_signature,
    GatewaySignatureVerifier,
};
pub use subscription::{
    ActivationRequest, ActivationWindow, Subscription, SubscriptionStatus, SubscriptionView,
};
