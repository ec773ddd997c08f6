//! Mock session validator for tests and local development.
//!
//! Maps fixed bearer tokens to principals so handlers and the HTTP router can
//! be exercised without a running auth service.
//!
//! # Example
//!
//! ```ignore
//! use subscription_billing::adapters::auth::MockSessionValidator;
//!
//! let validator = MockSessionValidator::new().with_user("token-a", "user-a");
//! let user = validator.validate("token-a").await?;
//! assert_eq!(user.id.as_str(), "user-a");
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Token-table validator. Unknown tokens yield `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as a session of `user_id`.
    ///
    /// Blank user ids are ignored, so the token stays invalid.
    pub fn with_user(self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.add_token(token, user_id);
        self
    }

    /// Forces every validation to fail with `error`.
    pub fn with_error(self, error: AuthError) -> Self {
        *write(&self.force_error) = Some(error);
        self
    }

    pub fn clear_error(&self) {
        *write(&self.force_error) = None;
    }

    /// Registers a token at runtime.
    pub fn add_token(&self, token: impl Into<String>, user_id: impl Into<String>) {
        if let Ok(id) = UserId::new(user_id) {
            write(&self.tokens).insert(token.into(), AuthenticatedUser::new(id));
        }
    }

    pub fn remove_token(&self, token: &str) {
        write(&self.tokens).remove(token);
    }

    pub fn token_count(&self) -> usize {
        read(&self.tokens).len()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = read(&self.force_error).clone() {
            return Err(error);
        }

        read(&self.tokens)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
