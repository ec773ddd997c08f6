//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, auth principal)
//! - `billing` - Plans, payment ledger entries, subscription activation rules,
//!   gateway signatures and webhook events

pub mod billing;
pub mod foundation;
