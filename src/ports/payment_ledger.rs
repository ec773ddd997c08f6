//! Payment ledger port.
//!
//! Durable log of payment attempts keyed by the gateway order id.
//!
//! # Design
//!
//! - **Order id is unique**: a second entry for the same order is rejected
//! - **Paid is terminal**: an entry is marked paid at most once
//! - **Conditional update**: `mark_paid` is a single compare-and-set, never
//!   a read-then-write pair

use async_trait::async_trait;

use crate::domain::billing::{MarkPaidOutcome, PaymentRecord};
use crate::domain::foundation::DomainError;

/// Repository port for payment ledger entries.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Insert a new entry in `created` state.
    ///
    /// # Errors
    ///
    /// - `DuplicateOrder` if the gateway order id already exists
    /// - `DatabaseError` on persistence failure
    async fn create_pending(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    /// Find an entry by gateway order id.
    async fn find_by_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Idempotency probe: the paid entry settled by this gateway payment, if any.
    async fn find_paid_by_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Transition the entry to `paid`, recording payment id and signature.
    ///
    /// Re-marking with the same payment id is a no-op returning
    /// `AlreadyPaid`.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound` if no entry exists for the order
    /// - `PaymentConflict` if the entry is paid by a different payment id
    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: Option<&str>,
    ) -> Result<MarkPaidOutcome, DomainError>;
}
