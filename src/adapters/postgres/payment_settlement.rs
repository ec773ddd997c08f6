//! PostgreSQL implementation of PaymentSettlement.
//!
//! Runs the conditional mark-paid and the subscription upsert in one
//! transaction. A concurrent settler of the same order blocks on the
//! payment row lock, then sees it paid and activates nothing.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::MarkPaidOutcome;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{PaymentSettlement, Settlement, SettlementOutcome};

use super::database_error;
use super::payment_ledger::mark_paid_in;
use super::subscription_repository::activate_in;

pub struct PostgresPaymentSettlement {
    pool: PgPool,
}

impl PostgresPaymentSettlement {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentSettlement for PostgresPaymentSettlement {
    async fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError> {
        let now = Timestamp::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("begin settlement", e))?;

        let outcome = mark_paid_in(
            &mut tx,
            &settlement.gateway_order_id,
            &settlement.gateway_payment_id,
            settlement.signature.as_deref(),
            now,
        )
        .await?;

        if outcome == MarkPaidOutcome::AlreadyPaid {
            tx.rollback()
                .await
                .map_err(|e| database_error("rollback settlement", e))?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let subscription = activate_in(&mut tx, &settlement.activation, now).await?;

        tx.commit()
            .await
            .map_err(|e| database_error("commit settlement", e))?;

        Ok(SettlementOutcome::Settled(subscription))
    }
}
