//! GetSubscriptionHandler - Query handler for the caller's active subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionView};
use crate::domain::foundation::UserId;

use super::SubscriptionActivator;

#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// Returns the subscription only while it is active; lapsed rows read as none.
pub struct GetSubscriptionHandler {
    activator: Arc<SubscriptionActivator>,
}

impl GetSubscriptionHandler {
    pub fn new(activator: Arc<SubscriptionActivator>) -> Self {
        Self { activator }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<Option<SubscriptionView>, BillingError> {
        self.activator.current(&query.user_id).await
    }
}
