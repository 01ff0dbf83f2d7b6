//! Permission catalog and system role definitions
//!
//! The catalog is global and seeded by migration; this module is the one
//! place that knows its composition. Role seeds built here are handed to the
//! organization bootstrap so every new organization starts with the same
//! three system roles.

use serde::{Deserialize, Serialize};

use vigil_interfaces::SystemRoleSeed;

/// Name of the seeded administrator role
pub const ADMIN_ROLE: &str = "Admin";
/// Name of the seeded operator role
pub const OPERATOR_ROLE: &str = "Operator";
/// Name of the seeded read-only role
pub const VIEWER_ROLE: &str = "Viewer";

/// Resource classes covered by the permission catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Resource {
    Containers,
    Alerts,
    Logs,
    Metrics,
    Incidents,
    Users,
    Roles,
    ApiKeys,
    Organization,
}

impl Resource {
    /// Convert to the string used in permission names
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Containers => "containers",
            Resource::Alerts => "alerts",
            Resource::Logs => "logs",
            Resource::Metrics => "metrics",
            Resource::Incidents => "incidents",
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::ApiKeys => "api-keys",
            Resource::Organization => "organization",
        }
    }
}

/// Action classes covered by the permission catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Action {
    Read,
    Operate,
    Manage,
}

impl Action {
    /// Convert to the string used in permission names
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Operate => "operate",
            Action::Manage => "manage",
        }
    }
}

/// Compose a `resource:action` permission name
pub fn permission_name(resource: Resource, action: Action) -> String {
    format!("{}:{}", resource.as_str(), action.as_str())
}

/// The full catalog, in seed order
pub fn catalog() -> Vec<String> {
    use Action::*;
    use Resource::*;

    [
        (Containers, Read),
        (Containers, Operate),
        (Alerts, Read),
        (Alerts, Operate),
        (Logs, Read),
        (Metrics, Read),
        (Incidents, Read),
        (Incidents, Operate),
        (Users, Read),
        (Users, Manage),
        (Roles, Read),
        (Roles, Manage),
        (ApiKeys, Read),
        (ApiKeys, Manage),
        (Organization, Manage),
    ]
    .into_iter()
    .map(|(r, a)| permission_name(r, a))
    .collect()
}

/// Permission names granted to the Operator role
pub fn operator_permissions() -> Vec<String> {
    use Action::*;
    use Resource::*;

    [
        (Containers, Read),
        (Containers, Operate),
        (Alerts, Read),
        (Alerts, Operate),
        (Logs, Read),
        (Metrics, Read),
        (Incidents, Read),
        (Incidents, Operate),
    ]
    .into_iter()
    .map(|(r, a)| permission_name(r, a))
    .collect()
}

/// Permission names granted to the Viewer role
pub fn viewer_permissions() -> Vec<String> {
    use Resource::*;

    [Containers, Alerts, Logs, Metrics, Incidents]
        .into_iter()
        .map(|r| permission_name(r, Action::Read))
        .collect()
}

/// The three role seeds provisioned for every new organization.
///
/// Admin is marked for assignment to the organization's first user.
pub fn system_role_seeds() -> Vec<SystemRoleSeed> {
    vec![
        SystemRoleSeed {
            name: ADMIN_ROLE.to_string(),
            description: "Full access to the organization".to_string(),
            permission_names: catalog(),
            assign_to_owner: true,
        },
        SystemRoleSeed {
            name: OPERATOR_ROLE.to_string(),
            description: "Operate runtime resources and incidents".to_string(),
            permission_names: operator_permissions(),
            assign_to_owner: false,
        },
        SystemRoleSeed {
            name: VIEWER_ROLE.to_string(),
            description: "Read-only access".to_string(),
            permission_names: viewer_permissions(),
            assign_to_owner: false,
        },
    ]
}
