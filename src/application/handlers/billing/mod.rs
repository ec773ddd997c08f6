//! Billing handlers.
//!
//! ## Commands
//! - Opening a gateway order for a paid plan
//! - Verifying a client-submitted checkout confirmation
//! - Processing gateway webhooks
//! - Activating a free plan
//!
//! ## Queries
//! - Get the caller's active subscription
//!
//! Verification and webhooks both funnel into `PaymentProcessor`, so the
//! idempotency probe and settlement logic exist once.

mod activate_free_plan;
mod create_order;
mod get_subscription;
mod handle_gateway_webhook;
mod process_payment;
mod subscription_activator;
mod verify_payment;

#[cfg(test)]
pub(crate) mod test_support;

// Services
pub use process_payment::{PaymentProcessor, ProcessOutcome};
pub use subscription_activator::SubscriptionActivator;

// Commands
pub use activate_free_plan::{ActivateFreePlanCommand, ActivateFreePlanHandler};
pub use create_order::{CreateOrderCommand, CreateOrderHandler, CreateOrderResult};
pub use handle_gateway_webhook::{
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler, HandleGatewayWebhookResult,
};
pub use verify_payment::{VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
