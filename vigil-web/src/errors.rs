//! Web error taxonomy
//!
//! Every failure that crosses the HTTP boundary becomes one of these
//! variants. Each variant maps to exactly one status code and one stable
//! error code, and responses always carry the `{"error": {...}}` envelope
//! from [`vigil_api_types::ApiError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use vigil_api_types::ApiError;
use vigil_auth::AuthError;
use vigil_interfaces::DatabaseError;
use vigil_rbac::RbacError;

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Errors produced by handlers and middleware
#[derive(Debug, Error)]
pub enum WebError {
    /// No usable credential on the request
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid email or password")]
    InvalidCredentials { attempts_remaining: Option<i32> },

    #[error("Account is locked until {unlock_at}")]
    AccountLocked { unlock_at: DateTime<Utc> },

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Invalid authentication token")]
    TokenInvalid,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key has expired")]
    ApiKeyExpired,

    #[error("Insufficient permissions")]
    InsufficientPermissions {
        required: Vec<String>,
        current: Vec<String>,
    },

    #[error("{message}")]
    CrossTenantAccessDenied { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    DuplicateResource { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("System role '{name}' cannot be modified or deleted")]
    SystemRoleProtected { name: String },

    #[error("Role '{name}' still has assigned users")]
    RoleHasAssignedUsers { name: String },

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: i64 },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },
}

impl WebError {
    pub fn not_found(message: impl Into<String>) -> Self {
        WebError::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        WebError::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        WebError::Internal {
            message: message.into(),
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::AuthenticationRequired
            | WebError::InvalidCredentials { .. }
            | WebError::AccountLocked { .. }
            | WebError::TokenExpired
            | WebError::TokenInvalid
            | WebError::InvalidApiKey
            | WebError::ApiKeyExpired => StatusCode::UNAUTHORIZED,
            WebError::InsufficientPermissions { .. } | WebError::CrossTenantAccessDenied { .. } => {
                StatusCode::FORBIDDEN
            }
            WebError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebError::DuplicateResource { .. } => StatusCode::CONFLICT,
            WebError::Validation { .. }
            | WebError::SystemRoleProtected { .. }
            | WebError::RoleHasAssignedUsers { .. } => StatusCode::BAD_REQUEST,
            WebError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            WebError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            WebError::AuthenticationRequired => "UNAUTHORIZED",
            WebError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            WebError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            WebError::TokenExpired => "TOKEN_EXPIRED",
            WebError::TokenInvalid => "TOKEN_INVALID",
            WebError::InvalidApiKey => "INVALID_API_KEY",
            WebError::ApiKeyExpired => "API_KEY_EXPIRED",
            WebError::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            WebError::CrossTenantAccessDenied { .. } => "CROSS_TENANT_ACCESS_DENIED",
            WebError::NotFound { .. } => "NOT_FOUND",
            WebError::DuplicateResource { .. } => "DUPLICATE_RESOURCE",
            WebError::Validation { .. } => "VALIDATION_ERROR",
            WebError::SystemRoleProtected { .. } => "SYSTEM_ROLE_PROTECTED",
            WebError::RoleHasAssignedUsers { .. } => "ROLE_HAS_ASSIGNED_USERS",
            WebError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            WebError::Internal { .. } => "INTERNAL_ERROR",
            WebError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }

    /// Wire form of this error. Internal detail never reaches the body;
    /// clients get a generic message while the detail goes to the log.
    pub fn api_error(&self) -> ApiError {
        let message = match self {
            WebError::Internal { .. } => "An internal error occurred".to_string(),
            WebError::ServiceUnavailable { .. } => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        };
        let api = ApiError::new(self.error_code(), message);

        match self {
            WebError::InvalidCredentials {
                attempts_remaining: Some(remaining),
            } => api.with_details(json!({ "attemptsRemaining": remaining })),
            WebError::AccountLocked { unlock_at } => api.with_details(json!({
                "lockedUntil": unlock_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            })),
            WebError::InsufficientPermissions { required, current } => {
                api.with_details(json!({ "required": required, "current": current }))
            }
            WebError::RateLimited { retry_after_secs } => {
                api.with_details(json!({ "retryAfterSecs": retry_after_secs }))
            }
            _ => api,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            WebError::Internal { .. } | WebError::ServiceUnavailable { .. }
        ) {
            error!(code = self.error_code(), "request failed: {self}");
        }
        (self.status_code(), Json(json!({ "error": self.api_error() }))).into_response()
    }
}

impl From<DatabaseError> for WebError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => WebError::NotFound {
                message: format!("{entity} not found: {id}"),
            },
            DatabaseError::Validation { message } => WebError::Validation { message },
            // Constraint text names store indexes and columns; it stays out
            // of the response body.
            DatabaseError::Constraint { .. } => WebError::DuplicateResource {
                message: "Resource already exists".to_string(),
            },
            DatabaseError::Connection { message } | DatabaseError::Transaction { message } => {
                WebError::ServiceUnavailable { message }
            }
            DatabaseError::Internal { message } => WebError::Internal { message },
        }
    }
}

impl From<AuthError> for WebError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Database(db) => db.into(),
            AuthError::InvalidCredentials { attempts_remaining } => {
                WebError::InvalidCredentials { attempts_remaining }
            }
            AuthError::AccountLocked { unlock_at } => WebError::AccountLocked { unlock_at },
            AuthError::TokenExpired => WebError::TokenExpired,
            AuthError::TokenInvalid => WebError::TokenInvalid,
            AuthError::InvalidApiKey => WebError::InvalidApiKey,
            AuthError::ApiKeyExpired => WebError::ApiKeyExpired,
            AuthError::DuplicateResource { message } => WebError::DuplicateResource { message },
            AuthError::Validation { message } => WebError::Validation { message },
            AuthError::UserNotFound { user_id } => WebError::NotFound {
                message: format!("User not found: {user_id}"),
            },
            AuthError::SessionNotFound { session_id } => WebError::NotFound {
                message: format!("Session not found: {session_id}"),
            },
            AuthError::ApiKeyNotFound { key_id } => WebError::NotFound {
                message: format!("API key not found: {key_id}"),
            },
            AuthError::Internal { message } => WebError::Internal { message },
        }
    }
}

impl From<RbacError> for WebError {
    fn from(error: RbacError) -> Self {
        match error {
            RbacError::Database(db) => db.into(),
            RbacError::RoleNotFound { role_id } => WebError::NotFound {
                message: format!("Role not found: {role_id}"),
            },
            RbacError::UserNotFound { user_id } => WebError::NotFound {
                message: format!("User not found: {user_id}"),
            },
            RbacError::SystemRoleProtected { name } => WebError::SystemRoleProtected { name },
            RbacError::RoleHasAssignedUsers { name } => WebError::RoleHasAssignedUsers { name },
            RbacError::CrossTenantAccessDenied { message } => {
                WebError::CrossTenantAccessDenied { message }
            }
            RbacError::Validation { message } => WebError::Validation { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn response_json(error: WebError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes_follow_the_taxonomy() {
        assert_eq!(WebError::AuthenticationRequired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(WebError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            WebError::InsufficientPermissions {
                required: vec![],
                current: vec![],
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WebError::not_found("Role not found: 9").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebError::DuplicateResource {
                message: "taken".to_string(),
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WebError::SystemRoleProtected {
                name: "Admin".to_string(),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebError::RateLimited { retry_after_secs: 30 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            WebError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_response_body_carries_the_error_envelope() {
        let (status, body) = response_json(WebError::InsufficientPermissions {
            required: vec!["roles:manage".to_string()],
            current: vec!["roles:read".to_string()],
        })
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
        assert_eq!(body["error"]["details"]["required"][0], "roles:manage");
        assert_eq!(body["error"]["details"]["current"][0], "roles:read");
    }

    #[tokio::test]
    async fn test_internal_detail_stays_out_of_the_body() {
        let (status, body) =
            response_json(WebError::internal("pool timed out talking to vigil.db")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "An internal error occurred");
        assert!(!body.to_string().contains("vigil.db"));
    }

    #[tokio::test]
    async fn test_account_locked_reports_unlock_time() {
        let unlock_at = Utc::now() + chrono::Duration::minutes(15);
        let (status, body) = response_json(WebError::AccountLocked { unlock_at }).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "ACCOUNT_LOCKED");
        assert_eq!(
            body["error"]["details"]["lockedUntil"],
            unlock_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err: WebError = AuthError::TokenExpired.into();
        assert_eq!(err.error_code(), "TOKEN_EXPIRED");

        let err: WebError = AuthError::InvalidCredentials {
            attempts_remaining: Some(2),
        }
        .into();
        assert!(matches!(
            err,
            WebError::InvalidCredentials {
                attempts_remaining: Some(2)
            }
        ));

        let err: WebError = AuthError::SessionNotFound { session_id: 12 }.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_rbac_error_conversion() {
        let err: WebError = RbacError::SystemRoleProtected {
            name: "Admin".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "SYSTEM_ROLE_PROTECTED");

        let err: WebError = RbacError::RoleNotFound { role_id: 41 }.into();
        assert_eq!(err.to_string(), "Role not found: 41");
    }

    #[test]
    fn test_database_error_conversion() {
        let err: WebError = DatabaseError::Constraint {
            message: "UNIQUE constraint failed: roles.organization_id, roles.name".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "DUPLICATE_RESOURCE");
        assert!(!err.to_string().contains("UNIQUE"));

        let err: WebError = DatabaseError::Connection {
            message: "pool exhausted".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
