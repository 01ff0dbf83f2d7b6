//! Unified API error representation
//!
//! Every surface (REST handlers, middleware, services) converges on this
//! code + message shape so clients see one error vocabulary regardless of
//! which layer rejected the request.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Unified API error
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Stable machine-readable error code, e.g. `INVALID_CREDENTIALS`
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Optional structured detail payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// HTTP status code this error maps to
    pub fn http_status_code(&self) -> u16 {
        match self.code.as_str() {
            "BAD_REQUEST" | "VALIDATION_ERROR" | "SYSTEM_ROLE_PROTECTED" | "ROLE_HAS_ASSIGNED_USERS" => 400,
            "UNAUTHORIZED" | "INVALID_CREDENTIALS" | "ACCOUNT_LOCKED" | "TOKEN_EXPIRED" | "TOKEN_INVALID"
            | "INVALID_API_KEY" | "API_KEY_EXPIRED" => 401,
            "FORBIDDEN" | "INSUFFICIENT_PERMISSIONS" | "CROSS_TENANT_ACCESS_DENIED" => 403,
            "NOT_FOUND" => 404,
            "CONFLICT" | "DUPLICATE_RESOURCE" => 409,
            "TIMEOUT" => 408,
            "RATE_LIMIT_EXCEEDED" => 429,
            "SERVICE_UNAVAILABLE" => 503,
            _ => 500,
        }
    }

    // Common constructors

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(entity: &str, message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", format!("{}: {}", entity, message.into()))
    }

    pub fn conflict(entity: &str, message: impl Into<String>) -> Self {
        Self::new("CONFLICT", format!("{}: {}", entity, message.into()))
    }

    pub fn validation_error(field: &str, message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", format!("{}: {}", field, message.into()))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn service_unavailable(message: Option<&str>) -> Self {
        Self::new(
            "SERVICE_UNAVAILABLE",
            message.unwrap_or("Service temporarily unavailable"),
        )
    }

    pub fn timeout(what: &str) -> Self {
        Self::new("TIMEOUT", format!("{} timed out", what))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::new("INVALID_CREDENTIALS", "x").http_status_code(), 401);
        assert_eq!(ApiError::new("ACCOUNT_LOCKED", "x").http_status_code(), 401);
        assert_eq!(ApiError::new("INSUFFICIENT_PERMISSIONS", "x").http_status_code(), 403);
        assert_eq!(ApiError::new("SYSTEM_ROLE_PROTECTED", "x").http_status_code(), 400);
        assert_eq!(ApiError::new("RATE_LIMIT_EXCEEDED", "x").http_status_code(), 429);
        assert_eq!(ApiError::new("DUPLICATE_RESOURCE", "x").http_status_code(), 409);
        assert_eq!(ApiError::new("SOMETHING_ELSE", "x").http_status_code(), 500);
    }

    #[test]
    fn test_details_round_trip() {
        let err = ApiError::forbidden("missing permissions")
            .with_details(serde_json::json!({"required": ["roles:manage"]}));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");
        assert_eq!(json["details"]["required"][0], "roles:manage");
    }
}
