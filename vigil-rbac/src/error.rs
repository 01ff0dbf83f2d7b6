//! Error types for RBAC operations

use thiserror::Error;
use vigil_interfaces::DatabaseError;

/// Result type for RBAC operations
pub type RbacResult<T> = Result<T, RbacError>;

/// RBAC-specific errors
#[derive(Error, Debug)]
pub enum RbacError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Role not found (or not visible to the caller's organization)
    #[error("Role not found: {role_id}")]
    RoleNotFound { role_id: i32 },

    /// User not found
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i32 },

    /// System roles cannot be updated or deleted
    #[error("System role '{name}' cannot be modified")]
    SystemRoleProtected { name: String },

    /// Role still has user assignments
    #[error("Role '{name}' still has assigned users")]
    RoleHasAssignedUsers { name: String },

    /// Caller and target belong to different organizations
    #[error("Cross-organization access denied: {message}")]
    CrossTenantAccessDenied { message: String },

    /// Invalid input
    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl RbacError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cross-tenant error
    pub fn cross_tenant(message: impl Into<String>) -> Self {
        Self::CrossTenantAccessDenied {
            message: message.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoleNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::Database(DatabaseError::NotFound { .. })
        )
    }

    /// Check if this error protects an immutable or in-use role
    pub fn is_role_protected(&self) -> bool {
        matches!(self, Self::SystemRoleProtected { .. } | Self::RoleHasAssignedUsers { .. })
    }
}
