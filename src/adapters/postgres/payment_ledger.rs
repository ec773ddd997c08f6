//! PostgreSQL implementation of PaymentLedger.
//!
//! `mark_paid` is a single conditional UPDATE. When it matches nothing the
//! current row is read to tell a replay from a conflict or a missing order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::billing::{
    order_not_found, payment_conflict, MarkPaidOutcome, PaymentRecord, PaymentStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PlanId, Timestamp, UserId,
};
use crate::ports::PaymentLedger;

use super::database_error;

const PAYMENT_COLUMNS: &str = "id, user_id, plan_id, gateway_order_id, gateway_payment_id, \
     signature, amount_minor_units, currency, status, created_at, paid_at";

/// PostgreSQL implementation of the PaymentLedger port.
pub struct PostgresPaymentLedger {
    pool: PgPool,
}

impl PostgresPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: String,
    plan_id: String,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    signature: Option<String>,
    amount_minor_units: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid payment row: {}", e))
        };
        Ok(PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt(e.to_string()))?,
            plan_id: PlanId::new(row.plan_id).map_err(|e| corrupt(e.to_string()))?,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            signature: row.signature,
            amount_minor_units: row.amount_minor_units,
            currency: row.currency,
            status: parse_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    s.parse::<PaymentStatus>().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment status value: {}", s),
        )
    })
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

/// Conditional transition to `paid` on the given connection.
///
/// Used directly by the ledger and inside the settlement transaction.
pub(super) async fn mark_paid_in(
    conn: &mut PgConnection,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: Option<&str>,
    now: Timestamp,
) -> Result<MarkPaidOutcome, DomainError> {
    let updated = sqlx::query(
        r#"
        UPDATE payments
        SET status = 'paid', gateway_payment_id = $2, signature = $3, paid_at = $4
        WHERE gateway_order_id = $1 AND status IN ('created', 'failed')
        "#,
    )
    .bind(gateway_order_id)
    .bind(gateway_payment_id)
    .bind(signature)
    .bind(now.as_datetime())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "payments_gateway_payment_id_key") {
            return payment_conflict(gateway_order_id);
        }
        database_error("mark payment paid", e)
    })?;

    if updated.rows_affected() == 1 {
        return Ok(MarkPaidOutcome::Transitioned);
    }

    let current: Option<(String, Option<String>)> = sqlx::query_as(
        "SELECT status, gateway_payment_id FROM payments WHERE gateway_order_id = $1",
    )
    .bind(gateway_order_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| database_error("read payment status", e))?;

    match current {
        None => Err(order_not_found(gateway_order_id)),
        Some((_, Some(existing))) if existing == gateway_payment_id => {
            Ok(MarkPaidOutcome::AlreadyPaid)
        }
        Some(_) => Err(payment_conflict(gateway_order_id)),
    }
}

#[async_trait]
impl PaymentLedger for PostgresPaymentLedger {
    async fn create_pending(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, plan_id, gateway_order_id, gateway_payment_id, signature,
                amount_minor_units, currency, status, created_at, paid_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(record.plan_id.as_str())
        .bind(&record.gateway_order_id)
        .bind(&record.gateway_payment_id)
        .bind(&record.signature)
        .bind(record.amount_minor_units)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(record.created_at.as_datetime())
        .bind(record.paid_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "payments_gateway_order_id_key") {
                return DomainError::new(ErrorCode::DuplicateOrder, "Order already recorded")
                    .with_detail("gateway_order_id", record.gateway_order_id.clone());
            }
            database_error("save payment", e)
        })?;

        Ok(())
    }

    async fn find_by_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE gateway_order_id = $1",
            PAYMENT_COLUMNS
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find payment by order", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_paid_by_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE gateway_payment_id = $1 AND status = 'paid'",
            PAYMENT_COLUMNS
        ))
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find payment by payment id", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: Option<&str>,
    ) -> Result<MarkPaidOutcome, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| database_error("acquire connection", e))?;
        mark_paid_in(
            &mut conn,
            gateway_order_id,
            gateway_payment_id,
            signature,
            Timestamp::now(),
        )
        .await
    }
}
