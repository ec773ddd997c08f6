//! Subscription repository port.
//!
//! Each user has at most one subscription row. `activate` and
//! `activate_unless_paid` are the only write paths, and each must be a single
//! atomic insert-or-update keyed on the user.

use async_trait::async_trait;

use crate::domain::billing::{ActivationRequest, Subscription};
use crate::domain::foundation::{DomainError, UserId};

/// Persistence for the per-user subscription row.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The user's row, whatever its status.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// Create or overwrite the user's row.
    ///
    /// An active, unexpired row is extended from its current expiry; any
    /// other row (or none) starts a fresh window at the current time. The
    /// read of the existing expiry and the write happen in one atomic step.
    async fn activate(&self, request: &ActivationRequest) -> Result<Subscription, DomainError>;

    /// Like `activate`, but leaves the row untouched and returns `None` when
    /// the user currently holds an active subscription to a paid plan.
    ///
    /// A plan is paid when its catalog price is above zero. A row whose plan
    /// is missing from the catalog counts as paid if it carries a gateway
    /// payment id. The check and the write happen in one atomic step.
    async fn activate_unless_paid(
        &self,
        request: &ActivationRequest,
    ) -> Result<Option<Subscription>, DomainError>;
}
