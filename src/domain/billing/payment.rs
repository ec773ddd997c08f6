//! Payment ledger entry and its lifecycle.
//!
//! A `PaymentRecord` is created when an order is opened with the gateway and
//! moves to `Paid` once a verified confirmation (client callback or webhook)
//! arrives. `gateway_order_id` is the idempotency anchor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PlanId, StateMachine, Timestamp, UserId, ValidationError,
};

/// Lifecycle status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(PaymentStatus::Created),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Created, Paid) | (Created, Failed) | (Failed, Paid)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Created => vec![Paid, Failed],
            // A failed attempt on an order can still be captured by a retry.
            Failed => vec![Paid],
            Paid => vec![],
        }
    }
}

/// Outcome of applying a verified confirmation to a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPaidOutcome {
    /// The entry moved to `Paid` in this call.
    Transitioned,
    /// The entry was already paid by the same gateway payment.
    AlreadyPaid,
}

/// One payment attempt, keyed by the gateway's order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
}

impl PaymentRecord {
    /// Opens a ledger entry for a freshly created gateway order.
    pub fn create_pending(
        user_id: UserId,
        plan_id: PlanId,
        gateway_order_id: impl Into<String>,
        amount_minor_units: i64,
        currency: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let gateway_order_id = gateway_order_id.into();
        if gateway_order_id.trim().is_empty() {
            return Err(ValidationError::empty_field("gateway_order_id"));
        }
        if amount_minor_units <= 0 {
            return Err(ValidationError::out_of_range(
                "amount_minor_units",
                1,
                i64::MAX,
                amount_minor_units,
            ));
        }

        Ok(Self {
            id: PaymentId::new(),
            user_id,
            plan_id,
            gateway_order_id,
            gateway_payment_id: None,
            signature: None,
            amount_minor_units,
            currency: currency.into(),
            status: PaymentStatus::Created,
            created_at: Timestamp::now(),
            paid_at: None,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Applies a verified confirmation.
    ///
    /// Re-applying the same gateway payment id to a paid entry is a no-op.
    /// A different payment id on a paid entry is a conflict and leaves the
    /// entry untouched.
    pub fn mark_paid(
        &mut self,
        gateway_payment_id: &str,
        signature: Option<&str>,
        now: Timestamp,
    ) -> Result<MarkPaidOutcome, DomainError> {
        if self.is_paid() {
            return if self.gateway_payment_id.as_deref() == Some(gateway_payment_id) {
                Ok(MarkPaidOutcome::AlreadyPaid)
            } else {
                Err(payment_conflict(&self.gateway_order_id))
            };
        }

        self.status = self.status.transition_to(PaymentStatus::Paid)?;
        self.gateway_payment_id = Some(gateway_payment_id.to_string());
        self.signature = signature.map(str::to_string);
        self.paid_at = Some(now);
        Ok(MarkPaidOutcome::Transitioned)
    }
}

/// Error raised when an order is already settled by another payment.
pub fn payment_conflict(gateway_order_id: &str) -> DomainError {
    DomainError::new(
        ErrorCode::PaymentConflict,
        "Order is already settled by a different payment",
    )
    .with_detail("gateway_order_id", gateway_order_id)
}

/// Error raised when no ledger entry exists for a gateway order.
pub fn order_not_found(gateway_order_id: &str) -> DomainError {
    DomainError::new(ErrorCode::OrderNotFound, "Order not found")
        .with_detail("gateway_order_id", gateway_order_id)
}
