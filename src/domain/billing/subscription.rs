//! Subscription entitlement and the activation window rule.
//!
//! Each user owns at most one subscription row. Activation overwrites it in
//! place. Whether it is active is derived from `status` and `expires_at`
//! against the current time, never trusted from `status` alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, UserId, ValidationError};

use super::plan::MAX_DURATION_DAYS;

const SECONDS_PER_DAY: i64 = 86_400;

/// Stored status of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "subscription_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// The single entitlement row of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    /// `None` for free-plan activations.
    pub gateway_payment_id: Option<String>,
    pub status: SubscriptionStatus,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// True iff the row is marked active and has not yet expired at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at.is_after(&now)
    }

    /// Whole days left, rounded up. Zero once inactive.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        if !self.is_active_at(now) {
            return 0;
        }
        let secs = self.expires_at.duration_since(&now).num_seconds();
        (secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }

    /// Produces the row resulting from `request` applied over `existing`.
    ///
    /// The row id is kept across activations so the user keeps one row.
    pub fn activate(
        existing: Option<&Subscription>,
        request: &ActivationRequest,
        now: Timestamp,
    ) -> Subscription {
        let window = ActivationWindow::compute(existing, request.duration_days, now);
        Subscription {
            id: existing.map(|s| s.id).unwrap_or_default(),
            user_id: request.user_id.clone(),
            plan_id: request.plan_id.clone(),
            gateway_payment_id: request.gateway_payment_id.clone(),
            status: SubscriptionStatus::Active,
            started_at: window.started_at,
            expires_at: window.expires_at,
            updated_at: now,
        }
    }
}

/// Input to the subscription activator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub gateway_payment_id: Option<String>,
    pub duration_days: u32,
}

impl ActivationRequest {
    pub fn new(
        user_id: UserId,
        plan_id: PlanId,
        gateway_payment_id: Option<String>,
        duration_days: u32,
    ) -> Result<Self, ValidationError> {
        if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
            return Err(ValidationError::out_of_range(
                "duration_days",
                1,
                i64::from(MAX_DURATION_DAYS),
                i64::from(duration_days),
            ));
        }
        Ok(Self {
            user_id,
            plan_id,
            gateway_payment_id,
            duration_days,
        })
    }
}

/// Start and end of the entitlement granted by one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationWindow {
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    /// True when unused time from an active row was carried over.
    pub extended: bool,
}

impl ActivationWindow {
    /// A renewal never loses unused paid time: an active row is extended
    /// from its current expiry, anything else starts fresh at `now`.
    pub fn compute(
        existing: Option<&Subscription>,
        duration_days: u32,
        now: Timestamp,
    ) -> ActivationWindow {
        let days = i64::from(duration_days);
        match existing.filter(|s| s.is_active_at(now)) {
            Some(current) => ActivationWindow {
                started_at: now,
                expires_at: current.expires_at.add_days(days),
                extended: true,
            },
            None => ActivationWindow {
                started_at: now,
                expires_at: now.add_days(days),
                extended: false,
            },
        }
    }
}

/// Subscription joined with its plan, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub plan_level: i32,
    pub gateway_payment_id: Option<String>,
    pub status: SubscriptionStatus,
    pub started_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub days_remaining: i64,
}

impl SubscriptionView {
    pub fn new(subscription: Subscription, plan_name: String, plan_level: i32, now: Timestamp) -> Self {
        Self {
            is_active: subscription.is_active_at(now),
            days_remaining: subscription.days_remaining(now),
            id: subscription.id,
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            plan_name,
            plan_level,
            gateway_payment_id: subscription.gateway_payment_id,
            status: subscription.status,
            started_at: subscription.started_at,
            expires_at: subscription.expires_at,
        }
    }
}
