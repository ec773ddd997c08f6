//! HTTP adapter for billing endpoints.
//!
//! - `POST /payments/create-order` - Open a gateway order for a paid plan
//! - `POST /payments/verify` - Confirm a checkout from the client
//! - `POST /payments/activate-free` - Activate a zero-price plan
//! - `GET /payments/my-subscription` - The caller's active subscription
//! - `POST /webhooks/gateway` - Signed gateway events (raw body)
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, SIGNATURE_HEADER};
pub use routes::{app_router, billing_router};
