//! Rate limiting configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiting configuration
///
/// `max_requests`/`window` apply to general traffic; the `auth_*` pair is a
/// stricter budget applied to credential endpoints (login, refresh, reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,

    /// Requests allowed per window for general traffic
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length for general traffic
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_window")]
    pub window: Duration,

    /// Requests allowed per window on credential endpoints
    #[serde(default = "default_auth_max_requests")]
    pub auth_max_requests: u32,

    /// Window length on credential endpoints
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_window")]
    pub auth_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window: default_window(),
            auth_max_requests: default_auth_max_requests(),
            auth_window: default_window(),
        }
    }
}

impl Validatable for RateLimitConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled {
            validate_positive(self.max_requests, "max_requests", self.domain_name())?;
            validate_positive(self.window.as_secs(), "window", self.domain_name())?;
            validate_positive(self.auth_max_requests, "auth_max_requests", self.domain_name())?;
            validate_positive(self.auth_window.as_secs(), "auth_window", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "rate_limit"
    }
}

// Default value functions
fn default_max_requests() -> u32 {
    100
}

fn default_auth_max_requests() -> u32 {
    10
}

fn default_window() -> Duration {
    Duration::from_secs(60)
}
