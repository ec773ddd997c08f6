//! HMAC-SHA256 verification of gateway signatures.
//!
//! Two signed messages reach the service:
//!
//! - the checkout callback, signed over `"{order_id}|{payment_id}"` with the
//!   API key secret;
//! - webhooks, signed over the exact raw request body with the webhook secret.
//!
//! Every check is total: malformed hex, empty input or a bad key yield
//! `false`, never a panic or an error. Comparison is constant-time.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a client-submitted payment confirmation.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &[u8],
) -> bool {
    let Some(expected) = compute_hmac(secret, payment_message(order_id, payment_id).as_bytes())
    else {
        return false;
    };
    matches_hex(&expected, signature)
}

/// Verifies a webhook against the raw, unparsed request body.
pub fn verify_webhook_signature(raw_body: &[u8], signature: &str, secret: &[u8]) -> bool {
    let Some(expected) = compute_hmac(secret, raw_body) else {
        return false;
    };
    matches_hex(&expected, signature)
}

/// Hex signature the gateway would issue for a checkout callback.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &[u8]) -> String {
    compute_hmac(secret, payment_message(order_id, payment_id).as_bytes())
        .map(hex::encode)
        .unwrap_or_default()
}

/// Hex signature the gateway would issue for a webhook body.
pub fn sign_webhook(raw_body: &[u8], secret: &[u8]) -> String {
    compute_hmac(secret, raw_body)
        .map(hex::encode)
        .unwrap_or_default()
}

fn payment_message(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

fn compute_hmac(secret: &[u8], message: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().to_vec())
}

fn matches_hex(expected: &[u8], provided_hex: &str) -> bool {
    if provided_hex.is_empty() {
        return false;
    }
    match hex::decode(provided_hex) {
        Ok(provided) => constant_time_compare(expected, &provided),
        Err(_) => false,
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Holds the gateway secrets and verifies both kinds of signature.
#[derive(Clone)]
pub struct GatewaySignatureVerifier {
    key_secret: SecretString,
    webhook_secret: SecretString,
}

impl GatewaySignatureVerifier {
    pub fn new(key_secret: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            key_secret,
            webhook_secret,
        }
    }

    pub fn verify_payment(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(
            order_id,
            payment_id,
            signature,
            self.key_secret.expose_secret().as_bytes(),
        )
    }

    pub fn verify_webhook(&self, raw_body: &[u8], signature: &str) -> bool {
        verify_webhook_signature(
            raw_body,
            signature,
            self.webhook_secret.expose_secret().as_bytes(),
        )
    }
}

impl std::fmt::Debug for GatewaySignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySignatureVerifier")
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY_SECRET: &[u8] = b"rzp_test_key_secret";
    const WEBHOOK_SECRET: &[u8] = b"whk_test_secret";

    // ══════════════════════════════════════════════════════════════
    // Payment signature
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_payment_signature_is_accepted() {
        let sig = sign_payment("order_1", "pay_1", KEY_SECRET);
        assert!(verify_payment_signature("order_1", "pay_1", &sig, KEY_SECRET));
    }

    #[test]
    fn upper_case_hex_is_accepted() {
        let sig = sign_payment("order_1", "pay_1", KEY_SECRET).to_uppercase();
        assert!(verify_payment_signature("order_1", "pay_1", &sig, KEY_SECRET));
    }

    #[test]
    fn signature_for_swapped_ids_is_rejected() {
        let sig = sign_payment("pay_1", "order_1", KEY_SECRET);
        assert!(!verify_payment_signature("order_1", "pay_1", &sig, KEY_SECRET));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign_payment("order_1", "pay_1", b"other");
        assert!(!verify_payment_signature("order_1", "pay_1", &sig, KEY_SECRET));
    }

    #[test]
    fn malformed_hex_is_rejected_without_panic() {
        assert!(!verify_payment_signature("order_1", "pay_1", "zz-not-hex", KEY_SECRET));
        assert!(!verify_payment_signature("order_1", "pay_1", "abc", KEY_SECRET));
        assert!(!verify_payment_signature("order_1", "pay_1", "", KEY_SECRET));
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let sig = sign_payment("order_1", "pay_1", KEY_SECRET);
        assert!(!verify_payment_signature("order_1", "pay_1", &sig[..62], KEY_SECRET));
    }

    proptest! {
        #[test]
        fn any_single_bit_flip_is_rejected(
            order_id in "order_[A-Za-z0-9]{1,20}",
            payment_id in "pay_[A-Za-z0-9]{1,20}",
            bit in 0usize..256,
        ) {
            let sig = sign_payment(&order_id, &payment_id, KEY_SECRET);
            let mut bytes = hex::decode(&sig).unwrap();
            bytes[bit / 8] ^= 1 << (bit % 8);
            let tampered = hex::encode(bytes);

            prop_assert!(!verify_payment_signature(&order_id, &payment_id, &tampered, KEY_SECRET));
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Webhook signature
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_webhook_signature_is_accepted() {
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        let sig = sign_webhook(body, WEBHOOK_SECRET);
        assert!(verify_webhook_signature(body, &sig, WEBHOOK_SECRET));
    }

    #[test]
    fn reserialized_body_is_rejected() {
        let raw = br#"{"event": "payment.captured", "account_id": "acc_1"}"#;
        let sig = sign_webhook(raw, WEBHOOK_SECRET);

        let value: serde_json::Value = serde_json::from_slice(raw).unwrap();
        let reserialized = serde_json::to_vec(&value).unwrap();

        assert_ne!(reserialized.as_slice(), raw.as_slice());
        assert!(!verify_webhook_signature(&reserialized, &sig, WEBHOOK_SECRET));
    }

    #[test]
    fn single_byte_change_in_body_is_rejected() {
        let body = br#"{"amount":49900}"#;
        let sig = sign_webhook(body, WEBHOOK_SECRET);
        assert!(!verify_webhook_signature(br#"{"amount":49901}"#, &sig, WEBHOOK_SECRET));
    }

    // ══════════════════════════════════════════════════════════════
    // Verifier
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verifier_uses_separate_secrets() {
        let verifier = GatewaySignatureVerifier::new(
            SecretString::new("rzp_test_key_secret".into()),
            SecretString::new("whk_test_secret".into()),
        );
        let body = b"{}";

        assert!(verifier.verify_webhook(body, &sign_webhook(body, WEBHOOK_SECRET)));
        assert!(!verifier.verify_webhook(body, &sign_webhook(body, KEY_SECRET)));
        assert!(verifier.verify_payment("o", "p", &sign_payment("o", "p", KEY_SECRET)));
    }

    #[test]
    fn verifier_debug_hides_secrets() {
        let verifier = GatewaySignatureVerifier::new(
            SecretString::new("key-secret-value".into()),
            SecretString::new("webhook-secret-value".into()),
        );
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains("secret-value"));
    }
}
