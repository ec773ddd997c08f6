//! Session validation adapters.
//!
//! - `JwtSessionValidator` - HS256 tokens from the external auth service
//! - `MockSessionValidator` - fixed token table for tests

mod jwt;
mod mock;

pub use jwt::JwtSessionValidator;
pub use mock::MockSessionValidator;
