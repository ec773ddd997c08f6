//! Payment settlement port.
//!
//! Settlement marks a ledger entry paid and activates the subscription it
//! pays for as one unit of work. Either both changes commit or neither does.
//! When two callers settle the same order concurrently, exactly one gets
//! `Settled`; the other observes `AlreadySettled` and activates nothing.

use async_trait::async_trait;

use crate::domain::billing::{ActivationRequest, Subscription};
use crate::domain::foundation::DomainError;

/// A verified payment ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: Option<String>,
    pub activation: ActivationRequest,
}

/// Result of applying a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The entry moved to paid and the subscription was activated.
    Settled(Subscription),
    /// The entry was already paid by this same payment; nothing changed.
    AlreadySettled,
}

/// Atomic mark-paid plus activate.
#[async_trait]
pub trait PaymentSettlement: Send + Sync {
    /// # Errors
    ///
    /// - `OrderNotFound` if no ledger entry exists for the order
    /// - `PaymentConflict` if the entry is paid by a different payment
    /// - `DatabaseError` on persistence failure (nothing is committed)
    async fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError>;
}
