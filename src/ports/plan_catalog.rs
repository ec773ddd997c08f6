//! Plan catalog port (read-only).
//!
//! Plans are managed outside this service; billing resolves them by id to
//! learn price, currency and duration.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};

/// Read access to purchasable plans.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Find a plan by id, including inactive ones.
    ///
    /// Returns `None` if the id does not resolve.
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;
}
