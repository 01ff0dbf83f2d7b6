//! Auth endpoint request and response models

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_api_types::UnifiedUser;
use vigil_auth::{AuthenticatedUser, IssuedSession};

/// Registration request. Creates the organization and its first user.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address; becomes the login
    pub email: String,
    pub password: String,
    /// Name of the organization to create
    pub organization_name: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Free-form client description stored with the refresh session
    pub device_info: Option<String>,
}

/// Refresh request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_info: Option<String>,
}

/// Password reset request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset confirmation
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub reset_token: String,
    pub new_password: String,
}

/// Password change request for an authenticated user
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Authenticated user with resolved roles and permissions
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: UnifiedUser,
    pub roles: Vec<String>,
    /// Union of the permissions granted through the user's roles
    pub permissions: Vec<String>,
}

impl From<AuthenticatedUser> for UserProfile {
    fn from(authenticated: AuthenticatedUser) -> Self {
        Self {
            roles: authenticated.roles,
            permissions: authenticated.permissions.iter().map(str::to_string).collect(),
            user: authenticated.user,
        }
    }
}

/// Issued token pair
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Opaque refresh secret; returned exactly once per rotation
    pub refresh_token: String,
    pub user: UserProfile,
}

impl SessionResponse {
    pub fn from_issued(session: IssuedSession, expires_in: i64) -> Self {
        Self {
            access_token: session.access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: session.refresh_token,
            user: session.user.into(),
        }
    }
}
