//! Authentication context carried through authorized requests

use serde::{Deserialize, Serialize};

use crate::catalog::ADMIN_ROLE;
use crate::permissions::PermissionSet;

/// Authenticated principal for one request.
///
/// Built by the authentication middleware from validated token claims and
/// consumed by guards, handlers and services. Everything here was resolved
/// at token issuance; live store state is consulted only where an operation
/// requires it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// User ID
    pub user_id: i32,

    /// User email
    pub email: String,

    /// Organization the user belongs to
    pub organization_id: i32,

    /// Role names assigned to the user
    pub roles: Vec<String>,

    /// Resolved permission names
    pub permissions: PermissionSet,

    /// Client IP as reported by the transport, for audit trails
    pub client_ip: Option<String>,
}

impl AuthContext {
    /// Create a new authentication context
    pub fn new(user_id: i32, email: impl Into<String>, organization_id: i32) -> Self {
        Self {
            user_id,
            email: email.into(),
            organization_id,
            roles: Vec::new(),
            permissions: PermissionSet::default(),
            client_ip: None,
        }
    }

    /// Attach role names
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Attach resolved permissions
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Attach the client IP
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    /// Check if the user holds a role, by exact name
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user holds one permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.has(permission)
    }

    /// Check if the user holds every required permission
    pub fn has_all_permissions<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.permissions.has_all(required)
    }

    /// Check if the user holds at least one required permission
    pub fn has_any_permission<S: AsRef<str>>(&self, required: &[S]) -> bool {
        self.permissions.has_any(required)
    }

    /// Check if the user holds the seeded Admin role
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}
