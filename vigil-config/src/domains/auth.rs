//! Authentication configuration
//!
//! The signing secret is the one field that must be supplied explicitly.
//! Everything else carries a sensible default: 15-minute access tokens,
//! 7-day refresh tokens, 1-hour reset tokens, lockout after 5 failures for
//! 15 minutes.

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret for access tokens. No default; must be at least
    /// 32 characters or startup fails.
    #[serde(default)]
    pub signing_secret: String,

    /// Access token lifetime
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_access_token_lifetime")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: Duration,

    /// Password reset token lifetime
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_reset_token_lifetime")]
    pub reset_token_lifetime: Duration,

    /// Consecutive failed logins before an account locks
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: i32,

    /// How long a locked account stays locked
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_lockout_duration")]
    pub lockout_duration: Duration,

    /// Token issuer claim
    #[serde(default = "default_token_issuer")]
    pub issuer: String,

    /// Token audience claim
    #[serde(default = "default_token_audience")]
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            reset_token_lifetime: default_reset_token_lifetime(),
            lockout_threshold: default_lockout_threshold(),
            lockout_duration: default_lockout_duration(),
            issuer: default_token_issuer(),
            audience: default_token_audience(),
        }
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.signing_secret, "signing_secret", self.domain_name())?;
        validate_required_string(&self.issuer, "issuer", self.domain_name())?;
        validate_required_string(&self.audience, "audience", self.domain_name())?;

        if self.signing_secret.len() < 32 {
            return Err(self.validation_error("signing_secret must be at least 32 characters long"));
        }

        validate_positive(
            self.access_token_lifetime.as_secs(),
            "access_token_lifetime",
            self.domain_name(),
        )?;
        validate_positive(
            self.refresh_token_lifetime.as_secs(),
            "refresh_token_lifetime",
            self.domain_name(),
        )?;
        validate_positive(
            self.reset_token_lifetime.as_secs(),
            "reset_token_lifetime",
            self.domain_name(),
        )?;
        validate_positive(self.lockout_threshold, "lockout_threshold", self.domain_name())?;
        validate_positive(self.lockout_duration.as_secs(), "lockout_duration", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "auth"
    }
}

// Default value functions
fn default_access_token_lifetime() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_refresh_token_lifetime() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

fn default_reset_token_lifetime() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_lockout_threshold() -> i32 {
    5
}

fn default_lockout_duration() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_token_issuer() -> String {
    "vigil".to_string()
}

fn default_token_audience() -> String {
    "vigil-api".to_string()
}
