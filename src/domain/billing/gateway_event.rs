//! Gateway webhook event parsing.
//!
//! Only `payment.captured` is acted upon. Other event types are reported as
//! [`GatewayEvent::Ignored`]. A captured event missing identifiers or
//! correlation notes is reported as [`GatewayEvent::Incomplete`] so the
//! caller can acknowledge it without retries.

use serde_json::Value;

use crate::domain::foundation::{PlanId, UserId};

use super::errors::BillingError;

/// Event name for a successfully captured payment.
pub const PAYMENT_CAPTURED: &str = "payment.captured";

/// Payment details carried by a `payment.captured` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPayment {
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub amount_minor_units: Option<i64>,
    pub currency: Option<String>,
    pub plan_id: PlanId,
    pub user_id: UserId,
}

/// A parsed webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCaptured(CapturedPayment),
    /// A captured event that lacks the named field.
    Incomplete { missing: &'static str },
    /// Any other event type, including a body with no usable `event` name.
    Ignored { event: String },
}

impl GatewayEvent {
    /// Parses the raw webhook body. Fails only when the body is not a JSON
    /// object.
    ///
    /// Fields are read leniently: a value of the wrong type is treated as
    /// absent, so a signed event never fails on data nothing acts upon.
    pub fn parse(raw_body: &[u8]) -> Result<Self, BillingError> {
        let raw: Value = serde_json::from_slice(raw_body)
            .map_err(|e| BillingError::MalformedPayload(e.to_string()))?;
        if !raw.is_object() {
            return Err(BillingError::MalformedPayload(
                "event body must be a JSON object".to_string(),
            ));
        }

        let event = raw.get("event").and_then(Value::as_str).unwrap_or_default();
        if event != PAYMENT_CAPTURED {
            return Ok(GatewayEvent::Ignored {
                event: event.to_string(),
            });
        }

        let Some(entity) = raw
            .pointer("/payload/payment/entity")
            .filter(|e| e.is_object())
        else {
            return Ok(GatewayEvent::Incomplete {
                missing: "payload.payment.entity",
            });
        };

        let Some(gateway_payment_id) = text(entity, "id") else {
            return Ok(GatewayEvent::Incomplete { missing: "id" });
        };
        let Some(gateway_order_id) = text(entity, "order_id") else {
            return Ok(GatewayEvent::Incomplete { missing: "order_id" });
        };

        let notes = entity.get("notes");
        let Some(plan_id) = note(notes, &["planId", "plan_id"])
            .and_then(|s| PlanId::new(s).ok())
        else {
            return Ok(GatewayEvent::Incomplete {
                missing: "notes.planId",
            });
        };
        let Some(user_id) = note(notes, &["userId", "user_id"])
            .and_then(|s| UserId::new(s).ok())
        else {
            return Ok(GatewayEvent::Incomplete {
                missing: "notes.userId",
            });
        };

        Ok(GatewayEvent::PaymentCaptured(CapturedPayment {
            gateway_payment_id,
            gateway_order_id,
            amount_minor_units: entity.get("amount").and_then(Value::as_i64),
            currency: text(entity, "currency"),
            plan_id,
            user_id,
        }))
    }
}

/// Non-blank string field; anything else reads as absent.
fn text(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Notes are an object when set, but the gateway sends `[]` when empty.
fn note(notes: Option<&Value>, keys: &[&str]) -> Option<String> {
    let notes = notes?;
    keys.iter()
        .find_map(|key| notes.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn captured_body(notes: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "entity": "event",
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_1",
                        "order_id": "order_1",
                        "amount": 49900,
                        "currency": "INR",
                        "notes": notes
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn parses_captured_payment() {
        let body = captured_body(json!({"planId": "basic", "userId": "u1"}));

        let event = GatewayEvent::parse(&body).unwrap();

        match event {
            GatewayEvent::PaymentCaptured(p) => {
                assert_eq!(p.gateway_payment_id, "pay_1");
                assert_eq!(p.gateway_order_id, "order_1");
                assert_eq!(p.amount_minor_units, Some(49900));
                assert_eq!(p.plan_id.as_str(), "basic");
                assert_eq!(p.user_id.as_str(), "u1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn accepts_snake_case_notes() {
        let body = captured_body(json!({"plan_id": "basic", "user_id": "u1"}));
        assert!(matches!(
            GatewayEvent::parse(&body).unwrap(),
            GatewayEvent::PaymentCaptured(_)
        ));
    }

    #[test]
    fn empty_notes_array_is_incomplete() {
        let body = captured_body(json!([]));
        assert_eq!(
            GatewayEvent::parse(&body).unwrap(),
            GatewayEvent::Incomplete {
                missing: "notes.planId"
            }
        );
    }

    #[test]
    fn missing_user_note_is_incomplete() {
        let body = captured_body(json!({"planId": "basic"}));
        assert_eq!(
            GatewayEvent::parse(&body).unwrap(),
            GatewayEvent::Incomplete {
                missing: "notes.userId"
            }
        );
    }

    #[test]
    fn missing_entity_is_incomplete() {
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        assert!(matches!(
            GatewayEvent::parse(body).unwrap(),
            GatewayEvent::Incomplete { .. }
        ));
    }

    #[test]
    fn other_events_are_ignored() {
        let body = br#"{"event":"order.paid","payload":{"order":{}}}"#;
        assert_eq!(
            GatewayEvent::parse(body).unwrap(),
            GatewayEvent::Ignored {
                event: "order.paid".to_string()
            }
        );
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            GatewayEvent::parse(b"{not json"),
            Err(BillingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn missing_event_field_is_ignored() {
        assert_eq!(
            GatewayEvent::parse(br#"{"payload":{}}"#).unwrap(),
            GatewayEvent::Ignored {
                event: String::new()
            }
        );
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(
            GatewayEvent::parse(b"[1, 2]"),
            Err(BillingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn string_amount_is_read_as_absent() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{
            "id":"pay_1","order_id":"order_1","amount":"49900","currency":356,
            "notes":{"planId":"basic","userId":"u1"}}}}}"#;

        match GatewayEvent::parse(body).unwrap() {
            GatewayEvent::PaymentCaptured(p) => {
                assert_eq!(p.gateway_payment_id, "pay_1");
                assert_eq!(p.amount_minor_units, None);
                assert_eq!(p.currency, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn numeric_payment_id_is_incomplete() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{
            "id":12345,"order_id":"order_1","notes":{"planId":"basic","userId":"u1"}}}}}"#;
        assert_eq!(
            GatewayEvent::parse(body).unwrap(),
            GatewayEvent::Incomplete { missing: "id" }
        );
    }

    #[test]
    fn numeric_order_id_is_incomplete() {
        let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{
            "id":"pay_1","order_id":7,"notes":{"planId":"basic","userId":"u1"}}}}}"#;
        assert_eq!(
            GatewayEvent::parse(body).unwrap(),
            GatewayEvent::Incomplete {
                missing: "order_id"
            }
        );
    }
}
