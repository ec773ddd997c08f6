//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment gateway configuration (Razorpay-compatible API)
///
/// `key_id` is public and handed to the checkout widget. Both secrets stay
/// on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Public key id (`rzp_test_...` or `rzp_live_...`)
    pub key_id: String,

    /// API secret, also the HMAC key for checkout signatures
    pub key_secret: SecretString,

    /// HMAC key for webhook bodies
    pub webhook_secret: SecretString,

    /// Base URL of the orders API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for gateway API calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_test_mode(&self) -> bool {
        self.key_id.starts_with("rzp_test_")
    }

    /// Validate gateway configuration
    ///
    /// Production must talk to the API over HTTPS.
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.key_id.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__KEY_ID"));
        }
        if self.key_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__KEY_SECRET"));
        }
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__WEBHOOK_SECRET"));
        }
        if !self.key_id.starts_with("rzp_") {
            return Err(ValidationError::InvalidGatewayKeyId);
        }
        if !(1..=60).contains(&self.request_timeout_secs) {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: SecretString::new(String::new()),
            webhook_secret: SecretString::new(String::new()),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
