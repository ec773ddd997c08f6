//! Plan catalog entry.
//!
//! Plans are owned by the catalog; billing only reads them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, ValidationError};

/// Longest window a single purchase may grant.
pub const MAX_DURATION_DAYS: u32 = 3650;

/// A purchasable plan.
///
/// `price_minor_units == 0` marks a free plan, activated without the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    /// Ordering rank of the tier (higher is richer).
    pub level: i32,
    /// Price in the currency's minor unit (paise, cents).
    pub price_minor_units: i64,
    /// ISO 4217 code, upper case.
    pub currency: String,
    pub duration_days: u32,
    pub is_active: bool,
}

impl Plan {
    /// Builds a plan, validating price, currency and duration.
    pub fn new(
        id: PlanId,
        name: impl Into<String>,
        level: i32,
        price_minor_units: i64,
        currency: impl Into<String>,
        duration_days: u32,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if price_minor_units < 0 {
            return Err(ValidationError::out_of_range(
                "price_minor_units",
                0,
                i64::MAX,
                price_minor_units,
            ));
        }
        let currency = currency.into().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
            return Err(ValidationError::out_of_range(
                "duration_days",
                1,
                i64::from(MAX_DURATION_DAYS),
                i64::from(duration_days),
            ));
        }

        Ok(Self {
            id,
            name,
            level,
            price_minor_units,
            currency,
            duration_days,
            is_active: true,
        })
    }

    /// Marks the plan as withdrawn from sale.
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn is_free(&self) -> bool {
        self.price_minor_units == 0
    }

    pub fn is_paid(&self) -> bool {
        self.price_minor_units > 0
    }
}
