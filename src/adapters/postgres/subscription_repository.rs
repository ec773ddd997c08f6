//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Activation is one `INSERT ... ON CONFLICT (user_id) DO UPDATE`. The
//! extension rule lives in the `expires_at` expression so the existing
//! expiry is read and overwritten under the same row lock. The free-plan
//! path adds a `WHERE` to the conflict update that refuses to replace an
//! active paid subscription.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::billing::{ActivationRequest, Subscription, SubscriptionStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::SubscriptionRepository;

use super::database_error;

/// The upsert, with an optional `WHERE` on the conflict update spliced in
/// before `RETURNING`.
macro_rules! activate_sql {
    ($conflict_guard:literal) => {
        concat!(
            r#"
    INSERT INTO subscriptions (
        id, user_id, plan_id, gateway_payment_id, status, started_at, expires_at, updated_at
    ) VALUES ($1, $2, $3, $4, 'active', $5, $5 + make_interval(days => $6), $5)
    ON CONFLICT (user_id) DO UPDATE SET
        plan_id = EXCLUDED.plan_id,
        gateway_payment_id = EXCLUDED.gateway_payment_id,
        status = 'active',
        started_at = EXCLUDED.started_at,
        expires_at = CASE
            WHEN subscriptions.status = 'active'
                 AND subscriptions.expires_at > EXCLUDED.started_at
            THEN subscriptions.expires_at + make_interval(days => $6)
            ELSE EXCLUDED.expires_at
        END,
        updated_at = EXCLUDED.updated_at"#,
            $conflict_guard,
            r#"
    RETURNING id, user_id, plan_id, gateway_payment_id, status, started_at, expires_at, updated_at
"#
        )
    };
}

const ACTIVATE_SQL: &str = activate_sql!("");

/// The conflicting row is locked before the `WHERE` is evaluated, so a
/// settlement committing concurrently is either seen here or waits for us.
const ACTIVATE_UNLESS_PAID_SQL: &str = activate_sql!(
    r#"
    WHERE NOT (
        subscriptions.status = 'active'
        AND subscriptions.expires_at > EXCLUDED.started_at
        AND COALESCE(
            (SELECT p.price_minor_units > 0 FROM plans p WHERE p.id = subscriptions.plan_id),
            subscriptions.gateway_payment_id IS NOT NULL
        )
    )"#
);

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan_id: String,
    gateway_payment_id: Option<String>,
    status: String,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid subscription row: {}", e),
            )
        };
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(|e| corrupt(e.to_string()))?,
            plan_id: PlanId::new(row.plan_id).map_err(|e| corrupt(e.to_string()))?,
            gateway_payment_id: row.gateway_payment_id,
            status: row
                .status
                .parse::<SubscriptionStatus>()
                .map_err(|e| corrupt(e.to_string()))?,
            started_at: Timestamp::from_datetime(row.started_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Atomic upsert of the user's row on the given connection.
///
/// Used directly by the repository and inside the settlement transaction.
pub(super) async fn activate_in(
    conn: &mut PgConnection,
    request: &ActivationRequest,
    now: Timestamp,
) -> Result<Subscription, DomainError> {
    upsert(conn, ACTIVATE_SQL, request, now)
        .await?
        .ok_or_else(|| DomainError::database("Subscription upsert returned no row"))
}

/// Runs one of the upsert statements. `None` means the conflict guard
/// rejected the update and nothing was written.
async fn upsert(
    conn: &mut PgConnection,
    sql: &'static str,
    request: &ActivationRequest,
    now: Timestamp,
) -> Result<Option<Subscription>, DomainError> {
    let duration_days = i32::try_from(request.duration_days).map_err(|_| {
        DomainError::new(ErrorCode::ValidationFailed, "Duration out of range")
            .with_detail("field", "duration_days")
    })?;

    let row: Option<SubscriptionRow> = sqlx::query_as(sql)
        .bind(SubscriptionId::new().as_uuid())
        .bind(request.user_id.as_str())
        .bind(request.plan_id.as_str())
        .bind(&request.gateway_payment_id)
        .bind(now.as_datetime())
        .bind(duration_days)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| database_error("activate subscription", e))?;

    row.map(Subscription::try_from).transpose()
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan_id, gateway_payment_id, status, started_at, expires_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn activate(&self, request: &ActivationRequest) -> Result<Subscription, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| database_error("acquire connection", e))?;
        activate_in(&mut conn, request, Timestamp::now()).await
    }

    async fn activate_unless_paid(
        &self,
        request: &ActivationRequest,
    ) -> Result<Option<Subscription>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| database_error("acquire connection", e))?;
        upsert(&mut conn, ACTIVATE_UNLESS_PAID_SQL, request, Timestamp::now()).await
    }
}
