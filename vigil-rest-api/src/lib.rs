//! # Vigil REST API
//!
//! REST surface for the Vigil authentication and authorization service.
//! Provides HTTP endpoints for credential flows, session management, RBAC
//! administration and API key issuance, guarded by the middleware stack from
//! `vigil-web`.
//!
//! ## Features
//!
//! - **Credential flows**: register, login, token refresh, password reset
//! - **Session management**: listing and revoking refresh sessions
//! - **RBAC administration**: role CRUD, assignments, permission lookups
//! - **API keys**: issuance with frozen permission snapshots, listing, revocation
//! - **OpenAPI documentation**: generated from the handler annotations
//!
//! ## Architecture
//!
//! Handlers receive their services through one [`AppContext`] injected as
//! axum state; the repository traits come from `vigil-interfaces`, so the
//! whole surface tests against mock repositories. Route guards are composed
//! per group in [`app::create_app`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use vigil_rest_api::{create_app, AppConfig, AppContext};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create your repository implementations
//! // let repositories = ...;
//!
//! // Wire the service stack and configure the application
//! // let context = AppContext::new(repositories, audit, tokens);
//! // let app = create_app(context, AppConfig::default());
//!
//! // Serve the application
//! // let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! // axum::serve(listener, app.into_make_service_with_connect_info::<std::net::SocketAddr>()).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod models;

// Re-export commonly used types
pub use app::{create_app, AppConfig, RateBudgets};
pub use context::AppContext;
pub use errors::{RestError, RestResult};
pub use models::*;

use utoipa::OpenApi;

/// OpenAPI 3.0 specification for the Vigil REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vigil Auth & RBAC API",
        description = "Multi-tenant authentication, session and role-based access control service."
    ),
    paths(
        // Credential and session endpoints
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::list_sessions,
        handlers::auth::revoke_session,
        handlers::auth::request_password_reset,
        handlers::auth::reset_password,
        handlers::auth::change_password,

        // Role and permission endpoints
        handlers::roles::list_permissions,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::create_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::roles::assign_role,
        handlers::roles::remove_role,
        handlers::roles::user_permissions,

        // API key endpoints
        handlers::api_keys::list_api_keys,
        handlers::api_keys::create_api_key,
        handlers::api_keys::revoke_api_key,

        // Health check
        handlers::health::health,
    ),
    components(
        schemas(
            // Credential request/response models
            models::auth::RegisterRequest,
            models::auth::LoginRequest,
            models::auth::RefreshRequest,
            models::auth::PasswordResetRequest,
            models::auth::PasswordResetConfirmRequest,
            models::auth::ChangePasswordRequest,
            models::auth::UserProfile,
            models::auth::SessionResponse,

            // Role request models
            models::roles::CreateRoleRequest,
            models::roles::UpdateRoleRequest,

            // API key request/response models
            models::api_keys::CreateApiKeyRequest,
            models::api_keys::IssuedApiKeyResponse,

            // Health models
            models::common::HealthResponse,
            models::common::HealthCheckResult,
            models::common::HealthStatus,

            // Domain types from vigil-api-types
            vigil_api_types::UnifiedUser,
            vigil_api_types::UnifiedRole,
            vigil_api_types::UnifiedPermission,
            vigil_api_types::UnifiedApiKey,
            vigil_api_types::UnifiedSession,
        )
    ),
    tags(
        (name = "auth", description = "Credential, session and password operations"),
        (name = "roles", description = "Role management and permission lookups"),
        (name = "api-keys", description = "API key issuance and revocation"),
        (name = "health", description = "System health")
    )
)]
pub struct ApiDoc;

/// Create OpenAPI specification as JSON
pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
