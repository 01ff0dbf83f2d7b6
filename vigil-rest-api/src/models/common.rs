//! Common response models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: HashMap<String, HealthCheckResult>,
}

/// Individual dependency check result
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthResponse {
    /// Aggregate individual checks into an overall status
    pub fn from_checks(checks: HashMap<String, HealthCheckResult>) -> Self {
        let unhealthy = checks
            .values()
            .any(|check| check.status == HealthStatus::Unhealthy);
        Self {
            status: if unhealthy {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Healthy
            },
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }
    }
}
