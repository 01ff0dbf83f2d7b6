//! Role endpoint request models

use serde::Deserialize;
use utoipa::ToSchema;

use vigil_interfaces::RoleChanges;
use vigil_rbac::CreateRole;

/// Role creation request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    /// Catalog permission ids attached to the role
    pub permission_ids: Vec<i32>,
}

impl From<CreateRoleRequest> for CreateRole {
    fn from(request: CreateRoleRequest) -> Self {
        CreateRole {
            name: request.name,
            description: request.description,
            permission_ids: request.permission_ids,
        }
    }
}

/// Partial role update. `permission_ids` replaces the whole set when present.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

impl From<UpdateRoleRequest> for RoleChanges {
    fn from(request: UpdateRoleRequest) -> Self {
        RoleChanges {
            name: request.name,
            description: request.description,
            permission_ids: request.permission_ids,
        }
    }
}
