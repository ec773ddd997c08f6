//! PostgreSQL implementation of PlanCatalog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::ports::PlanCatalog;

use super::database_error;

/// Reads plans from the `plans` table, which is owned by the catalog service.
pub struct PostgresPlanCatalog {
    pool: PgPool,
}

impl PostgresPlanCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: String,
    name: String,
    level: i32,
    price_minor_units: i64,
    currency: String,
    duration_days: i32,
    is_active: bool,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let invalid = |e: String| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan row: {}", e))
                .with_detail("plan_id", row.id.clone())
        };
        let duration_days = u32::try_from(row.duration_days).map_err(|e| invalid(e.to_string()))?;
        let id = PlanId::new(row.id.clone()).map_err(|e| invalid(e.to_string()))?;

        let plan = Plan::new(
            id,
            row.name.clone(),
            row.level,
            row.price_minor_units,
            row.currency.clone(),
            duration_days,
        )
        .map_err(|e| invalid(e.to_string()))?;

        Ok(if row.is_active { plan } else { plan.deactivated() })
    }
}

#[async_trait]
impl PlanCatalog for PostgresPlanCatalog {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, level, price_minor_units, currency, duration_days, is_active
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find plan", e))?;

        row.map(Plan::try_from).transpose()
    }
}
