//! Authentication services for Vigil
//!
//! Everything that establishes or refuses an identity lives here:
//!
//! - [`CredentialService`]: login with lockout, registration, refresh token
//!   rotation, logout and the password reset flow
//! - [`JwtManager`]: HS256 access tokens carrying the authorization snapshot
//! - [`ApiKeyService`]: issuance and validation of `sk_` keys for
//!   programmatic callers
//! - [`RateLimiter`]: fixed-window request limiting backed by the store
//!
//! Services depend on the `vigil-interfaces` repository traits, never on a
//! concrete storage backend, and emit audit events through [`AuditSink`].
//!
//! [`AuditSink`]: vigil_interfaces::AuditSink

pub mod credentials;
pub mod error;
pub mod keys;
pub mod password;
pub mod rate_limit;
pub mod token;

mod secrets;

pub use credentials::{AuthenticatedUser, CredentialPolicy, CredentialService, IssuedSession};
pub use error::{AuthError, AuthResult};
pub use keys::{ApiKeyIdentity, ApiKeyService, IssuedApiKey};
pub use password::PasswordHasher;
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use token::{AccessClaims, JwtManager, TokenConfig};
