//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `PlanCatalog` - Read-only plan lookup
//! - `PaymentLedger` - Payment attempts keyed by gateway order id
//! - `SubscriptionRepository` - Per-user subscription row with atomic activation
//! - `PaymentSettlement` - Mark paid and activate in one unit of work
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Gateway order creation
//! - `SessionValidator` - Bearer token validation

mod payment_gateway;
mod payment_ledger;
mod payment_settlement;
mod plan_catalog;
mod session_validator;
mod subscription_repository;

pub use payment_gateway::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};
pub use payment_ledger::PaymentLedger;
pub use payment_settlement::{PaymentSettlement, Settlement, SettlementOutcome};
pub use plan_catalog::PlanCatalog;
pub use session_validator::SessionValidator;
pub use subscription_repository::SubscriptionRepository;
