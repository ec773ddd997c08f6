//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session token validation (JWT, mock)
//! - `http` - axum routes, handlers and middleware
//! - `memory` - In-process storage for tests and local runs
//! - `postgres` - PostgreSQL storage
//! - `razorpay` - Payment gateway client (HTTP, mock)

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod razorpay;
