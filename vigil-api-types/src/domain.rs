use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ApiId;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Unified User representation
///
/// Carries only what API consumers are allowed to see; credential and
/// lockout bookkeeping stay inside the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedUser {
    pub id: ApiId,
    pub email: String,
    pub organization_id: ApiId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    // Password hash and lockout counters are never included in API responses
}

/// Unified Organization representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedOrganization {
    pub id: ApiId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unified Role representation with its attached permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRole {
    pub id: ApiId,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: ApiId,
    pub is_system_role: bool,
    pub permissions: Vec<UnifiedPermission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnifiedRole {
    /// Names of the permissions attached to this role
    pub fn permission_names(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.name.clone()).collect()
    }
}

/// Unified Permission representation (global catalog entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedPermission {
    pub id: ApiId,
    /// Canonical `resource:action` name, e.g. `containers:read`
    pub name: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

/// Unified API key representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedApiKey {
    pub id: ApiId,
    pub name: String,
    pub user_id: ApiId,
    pub organization_id: ApiId,
    pub key_prefix: String, // Only prefix shown for security
    /// Permission names frozen at issuance time
    pub scoped_permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    // Key hash is never included in API responses
}

/// Unified refresh-session representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UnifiedSession {
    pub id: ApiId,
    pub user_id: ApiId,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    // Token hash is an internal field not exposed via API
}
