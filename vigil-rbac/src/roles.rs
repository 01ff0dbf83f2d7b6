//! Role service: organization-scoped role CRUD and user assignment

use std::sync::Arc;

use tracing::{debug, info};

use vigil_api_types::{ListResponse, PaginationInput, UnifiedRole};
use vigil_interfaces::{AuditEvent, AuditSink, NewRole, RepositoryFactory, RoleChanges, RoleDeleteOutcome};

use crate::auth::AuthContext;
use crate::error::{RbacError, RbacResult};
use crate::permissions::PermissionSet;

/// Input for creating a custom role
#[derive(Debug, Clone)]
pub struct CreateRole {
    pub name: String,
    pub description: Option<String>,
    pub permission_ids: Vec<i32>,
}

/// Role service scoped to the acting caller's organization.
///
/// Every lookup is filtered to the caller's organization; roles in other
/// organizations read as not found rather than as forbidden. Assignment is
/// the one place a cross-organization condition is reported explicitly,
/// because there the caller names two subjects that must agree.
#[derive(Clone)]
pub struct RoleService {
    repositories: Arc<dyn RepositoryFactory>,
    audit: Arc<dyn AuditSink>,
}

impl RoleService {
    /// Create a new role service
    pub fn new(repositories: Arc<dyn RepositoryFactory>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repositories, audit }
    }

    /// Create a custom role with its permission set
    pub async fn create_role(&self, ctx: &AuthContext, input: CreateRole) -> RbacResult<UnifiedRole> {
        validate_role_name(&input.name)?;
        validate_description(input.description.as_deref())?;
        validate_permission_ids(&input.permission_ids)?;

        let role = self
            .repositories
            .role_repository()
            .create_with_permissions(NewRole {
                name: input.name,
                description: input.description,
                organization_id: ctx.organization_id,
                is_system_role: false,
                permission_ids: input.permission_ids,
            })
            .await?;

        info!(role = %role.name, organization_id = ctx.organization_id, "role created");
        self.audit.record(
            self.event("rbac.role.create", ctx)
                .with_resource_id(role.id.as_str())
                .with_detail("name", role.name.clone()),
        );

        Ok(role)
    }

    /// Fetch one role in the caller's organization
    pub async fn get_role(&self, ctx: &AuthContext, role_id: i32) -> RbacResult<UnifiedRole> {
        let role = self
            .repositories
            .role_repository()
            .find_by_id(role_id)
            .await?
            .ok_or(RbacError::RoleNotFound { role_id })?;

        if role.organization_id.as_i32() != Some(ctx.organization_id) {
            return Err(RbacError::RoleNotFound { role_id });
        }

        Ok(role)
    }

    /// List the caller's organization roles with pagination
    pub async fn list_roles(
        &self,
        ctx: &AuthContext,
        pagination: PaginationInput,
    ) -> RbacResult<ListResponse<UnifiedRole>> {
        Ok(self
            .repositories
            .role_repository()
            .list_for_organization(ctx.organization_id, pagination)
            .await?)
    }

    /// Apply a partial update. A supplied permission set fully replaces the
    /// existing one. System roles cannot be updated.
    pub async fn update_role(&self, ctx: &AuthContext, role_id: i32, changes: RoleChanges) -> RbacResult<UnifiedRole> {
        let existing = self.get_role(ctx, role_id).await?;
        if existing.is_system_role {
            return Err(RbacError::SystemRoleProtected { name: existing.name });
        }

        if let Some(name) = changes.name.as_deref() {
            validate_role_name(name)?;
        }
        validate_description(changes.description.as_deref())?;
        if let Some(ids) = changes.permission_ids.as_deref() {
            validate_permission_ids(ids)?;
        }

        let role = self
            .repositories
            .role_repository()
            .update_with_permissions(role_id, changes)
            .await?;

        info!(role = %role.name, organization_id = ctx.organization_id, "role updated");
        self.audit.record(
            self.event("rbac.role.update", ctx)
                .with_resource_id(role.id.as_str())
                .with_detail("name", role.name.clone()),
        );

        Ok(role)
    }

    /// Delete a custom role.
    ///
    /// The store performs one conditional delete; when nothing was deleted
    /// the outcome tells us which guard held.
    pub async fn delete_role(&self, ctx: &AuthContext, role_id: i32) -> RbacResult<()> {
        let existing = self.get_role(ctx, role_id).await?;

        match self.repositories.role_repository().delete_conditional(role_id).await? {
            RoleDeleteOutcome::Deleted => {
                info!(role = %existing.name, organization_id = ctx.organization_id, "role deleted");
                self.audit.record(
                    self.event("rbac.role.delete", ctx)
                        .with_resource_id(role_id.to_string())
                        .with_detail("name", existing.name),
                );
                Ok(())
            }
            RoleDeleteOutcome::NotFound => Err(RbacError::RoleNotFound { role_id }),
            RoleDeleteOutcome::SystemRole => Err(RbacError::SystemRoleProtected { name: existing.name }),
            RoleDeleteOutcome::HasAssignedUsers => Err(RbacError::RoleHasAssignedUsers { name: existing.name }),
        }
    }

    /// Assign a role to a user in the caller's organization.
    ///
    /// Idempotent: returns false when the assignment already existed.
    pub async fn assign_role(&self, ctx: &AuthContext, user_id: i32, role_id: i32) -> RbacResult<bool> {
        let role = self.get_role(ctx, role_id).await?;
        self.target_user_in_organization(ctx, user_id).await?;

        let newly_assigned = self
            .repositories
            .role_repository()
            .assign_to_user(user_id, role_id)
            .await?;

        if newly_assigned {
            debug!(user_id, role = %role.name, "role assigned");
            self.audit.record(
                self.event("rbac.role.assign", ctx)
                    .with_resource_id(role_id.to_string())
                    .with_detail("name", role.name)
                    .with_detail("targetUserId", user_id),
            );
        }

        Ok(newly_assigned)
    }

    /// Remove a role from a user in the caller's organization.
    ///
    /// Idempotent: returns false when there was nothing to remove.
    pub async fn remove_role(&self, ctx: &AuthContext, user_id: i32, role_id: i32) -> RbacResult<bool> {
        let role = self.get_role(ctx, role_id).await?;
        self.target_user_in_organization(ctx, user_id).await?;

        let removed = self
            .repositories
            .role_repository()
            .remove_from_user(user_id, role_id)
            .await?;

        if removed {
            debug!(user_id, role = %role.name, "role removed");
            self.audit.record(
                self.event("rbac.role.remove", ctx)
                    .with_resource_id(role_id.to_string())
                    .with_detail("name", role.name)
                    .with_detail("targetUserId", user_id),
            );
        }

        Ok(removed)
    }

    /// Roles assigned to a user in the caller's organization
    pub async fn user_roles(&self, ctx: &AuthContext, user_id: i32) -> RbacResult<Vec<UnifiedRole>> {
        self.visible_user(ctx, user_id).await?;
        Ok(self.repositories.role_repository().roles_for_user(user_id).await?)
    }

    /// Resolved permission set of a user in the caller's organization
    pub async fn user_permissions(&self, ctx: &AuthContext, user_id: i32) -> RbacResult<PermissionSet> {
        self.visible_user(ctx, user_id).await?;
        let names = self
            .repositories
            .role_repository()
            .permission_names_for_user(user_id)
            .await?;
        Ok(PermissionSet::from_names(names))
    }

    fn event(&self, action: &str, ctx: &AuthContext) -> AuditEvent {
        let mut event = AuditEvent::new(action, "role").with_user(ctx.user_id);
        if let Some(ip) = &ctx.client_ip {
            event = event.with_ip(ip.clone());
        }
        event
    }

    /// Resolve a target user that must share the caller's organization,
    /// reported explicitly when it does not
    async fn target_user_in_organization(&self, ctx: &AuthContext, user_id: i32) -> RbacResult<()> {
        let user = self
            .repositories
            .user_repository()
            .find_by_id(user_id)
            .await?
            .ok_or(RbacError::UserNotFound { user_id })?;

        if user.organization_id != ctx.organization_id {
            return Err(RbacError::cross_tenant(format!(
                "user {} belongs to a different organization",
                user_id
            )));
        }

        Ok(())
    }

    /// Resolve a target user for read paths; foreign users read as not found
    async fn visible_user(&self, ctx: &AuthContext, user_id: i32) -> RbacResult<()> {
        let user = self
            .repositories
            .user_repository()
            .find_by_id(user_id)
            .await?
            .ok_or(RbacError::UserNotFound { user_id })?;

        if user.organization_id != ctx.organization_id {
            return Err(RbacError::UserNotFound { user_id });
        }

        Ok(())
    }
}

fn validate_role_name(name: &str) -> RbacResult<()> {
    if name.trim().is_empty() {
        return Err(RbacError::validation("Role name cannot be empty"));
    }

    if name.len() > 100 {
        return Err(RbacError::validation("Role name cannot exceed 100 characters"));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-') {
        return Err(RbacError::validation(
            "Role name can only contain alphanumeric characters, spaces, underscores, and hyphens",
        ));
    }

    Ok(())
}

fn validate_description(description: Option<&str>) -> RbacResult<()> {
    if let Some(description) = description {
        if description.len() > 500 {
            return Err(RbacError::validation("Role description cannot exceed 500 characters"));
        }
    }
    Ok(())
}

fn validate_permission_ids(ids: &[i32]) -> RbacResult<()> {
    if ids.is_empty() {
        return Err(RbacError::validation("Role must grant at least one permission"));
    }
    Ok(())
}
