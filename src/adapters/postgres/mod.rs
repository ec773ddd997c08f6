//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresPlanCatalog` - Read-only plan lookup
//! - `PostgresPaymentLedger` - Payment attempts with conditional mark-paid
//! - `PostgresSubscriptionRepository` - Atomic per-user upsert
//! - `PostgresPaymentSettlement` - Mark paid and activate in one transaction

mod payment_ledger;
mod payment_settlement;
mod plan_catalog;
mod subscription_repository;

pub use payment_ledger::PostgresPaymentLedger;
pub use payment_settlement::PostgresPaymentSettlement;
pub use plan_catalog::PostgresPlanCatalog;
pub use subscription_repository::PostgresSubscriptionRepository;

use crate::domain::foundation::DomainError;

fn database_error(action: &str, err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "Failed to {}", action);
    DomainError::database(format!("Failed to {}: {}", action, err))
}
