//! HS256 bearer token validation.
//!
//! Sessions are issued by the external auth service and signed with a shared
//! secret. Every token is checked for:
//! - **Signature**: HMAC-SHA256 with the configured secret
//! - **Issuer (iss)**: must equal the configured issuer
//! - **Audience (aud)**: must contain the configured audience
//! - **Expiry (exp)**: must be in the future (default leeway applies)
//!
//! The `sub` claim becomes the opaque principal id.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
}

/// Validates session JWTs signed with a shared HS256 secret.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(secret: &SecretString, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionValidator")
            .field("issuer", &self.validation.iss)
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Session token expired");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    tracing::warn!(error = %e, "Session token issued for another party");
                    AuthError::InvalidToken
                }
                _ => {
                    tracing::debug!(error = %e, "Session token rejected");
                    AuthError::InvalidToken
                }
            })?;

        let id = UserId::new(data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-session-secret";
    const ISSUER: &str = "https://auth.example.test";
    const AUDIENCE: &str = "billing-api";

    fn validator() -> JwtSessionValidator {
        JwtSessionValidator::new(&SecretString::new(SECRET.to_string()), ISSUER, AUDIENCE)
    }

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    fn claims(sub: &str) -> serde_json::Value {
        json!({ "sub": sub, "iss": ISSUER, "aud": AUDIENCE, "exp": in_an_hour() })
    }

    #[tokio::test]
    async fn valid_token_yields_subject_as_user_id() {
        let user = validator()
            .validate(&token(claims("user-42"), SECRET))
            .await
            .unwrap();

        assert_eq!(user.id.as_str(), "user-42");
    }

    #[tokio::test]
    async fn audience_may_be_a_list() {
        let claims = json!({
            "sub": "user-42",
            "iss": ISSUER,
            "aud": ["other-api", AUDIENCE],
            "exp": in_an_hour(),
        });

        assert!(validator().validate(&token(claims, SECRET)).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let result = validator()
            .validate(&token(claims("user-42"), "another-secret"))
            .await;

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let claims = json!({
            "sub": "user-42",
            "iss": ISSUER,
            "aud": AUDIENCE,
            "exp": chrono::Utc::now().timestamp() - 3600,
        });

        let result = validator().validate(&token(claims, SECRET)).await;

        assert_eq!(result, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn foreign_issuer_is_invalid() {
        let claims = json!({
            "sub": "user-42",
            "iss": "https://evil.example.test",
            "aud": AUDIENCE,
            "exp": in_an_hour(),
        });

        let result = validator().validate(&token(claims, SECRET)).await;

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn foreign_audience_is_invalid() {
        let claims = json!({
            "sub": "user-42",
            "iss": ISSUER,
            "aud": "some-other-api",
            "exp": in_an_hour(),
        });

        let result = validator().validate(&token(claims, SECRET)).await;

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn blank_subject_is_invalid() {
        let result = validator().validate(&token(claims("  "), SECRET)).await;

        assert_eq!(result, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let result = validator().validate("not.a.jwt").await;

        assert_eq!(result, Err(AuthError::InvalidToken));
    }
}
