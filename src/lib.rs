//! Subscription billing service.
//!
//! Creates gateway orders for paid plans, verifies checkout confirmations and
//! signed webhooks, and activates or extends the per-user subscription
//! exactly once per payment.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
