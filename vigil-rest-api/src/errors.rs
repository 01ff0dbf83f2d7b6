//! REST error type
//!
//! Thin wrapper so handlers can use `?` on any service error. Responses are
//! rendered by [`WebError`], which owns the status and code mapping.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use vigil_auth::AuthError;
use vigil_interfaces::DatabaseError;
use vigil_rbac::RbacError;
use vigil_web::WebError;

/// Errors surfaced by REST handlers
#[derive(Debug, Error)]
pub enum RestError {
    #[error(transparent)]
    Web(#[from] WebError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Rbac(#[from] RbacError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

impl RestError {
    pub fn validation(message: impl Into<String>) -> Self {
        RestError::Web(WebError::validation(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        RestError::Web(WebError::not_found(message))
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let web: WebError = match self {
            RestError::Web(e) => e,
            RestError::Auth(e) => e.into(),
            RestError::Rbac(e) => e.into(),
            RestError::Database(e) => e.into(),
        };
        web.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_service_errors_render_through_the_taxonomy() {
        let response = RestError::from(AuthError::TokenExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = RestError::from(RbacError::RoleNotFound { role_id: 9 }).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = RestError::validation("name too long").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
