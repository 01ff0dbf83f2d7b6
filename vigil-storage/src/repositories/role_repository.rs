//! Role repository implementation using SeaORM
//!
//! Role writes that touch the permission links run inside a
//! transaction. Deletion is a single guarded statement so the
//! existence, system-role and assignment checks cannot race with a
//! concurrent assignment.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use sea_query::{OnConflict, Query};

use vigil_api_types::{ListResponse, PaginationInput, PaginationMeta, UnifiedRole};
use vigil_interfaces::{DatabaseError, NewRole, Repository, RoleChanges, RoleDeleteOutcome, RoleRepository};

use crate::connection::DatabaseConnection;
use crate::entities::{
    permissions, role_permissions, roles, user_roles, Permissions, RolePermissions, Roles, UserRoles,
};
use crate::repositories::{map_write_err, to_unified_role};

/// SeaORM implementation of the RoleRepository
#[derive(Clone)]
pub struct SeaOrmRoleRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmRoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve permission ids to rows, rejecting unknown ids
    async fn resolve_permissions<C: ConnectionTrait>(
        conn: &C,
        ids: &[i32],
    ) -> Result<Vec<permissions::Model>, DatabaseError> {
        let unique: BTreeSet<i32> = ids.iter().copied().collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = Permissions::find()
            .filter(permissions::Column::Id.is_in(unique.clone()))
            .order_by_asc(permissions::Column::Id)
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to resolve permissions: {}", e),
            })?;

        if resolved.len() != unique.len() {
            let found: BTreeSet<i32> = resolved.iter().map(|p| p.id).collect();
            let missing: Vec<String> = unique.difference(&found).map(|id| id.to_string()).collect();
            return Err(DatabaseError::Validation {
                message: format!("Unknown permission ids: {}", missing.join(", ")),
            });
        }

        Ok(resolved)
    }

    /// Replace the permission links of a role with the given set
    async fn replace_permission_links<C: ConnectionTrait>(
        conn: &C,
        role_id: i32,
        resolved: &[permissions::Model],
    ) -> Result<(), DatabaseError> {
        RolePermissions::delete_many()
            .filter(role_permissions::Column::RoleId.eq(role_id))
            .exec(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to clear permission links: {}", e),
            })?;

        if !resolved.is_empty() {
            let links: Vec<role_permissions::ActiveModel> = resolved
                .iter()
                .map(|permission| role_permissions::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(permission.id),
                })
                .collect();

            RolePermissions::insert_many(links)
                .exec_without_returning(conn)
                .await
                .map_err(|e| map_write_err("Failed to write permission links", e))?;
        }

        Ok(())
    }

    /// Load each role's permission rows and produce unified roles
    async fn attach_permissions<C: ConnectionTrait>(
        conn: &C,
        role_models: Vec<roles::Model>,
    ) -> Result<Vec<UnifiedRole>, DatabaseError> {
        if role_models.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<i32> = role_models.iter().map(|r| r.id).collect();
        let links = RolePermissions::find()
            .filter(role_permissions::Column::RoleId.is_in(role_ids))
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load permission links: {}", e),
            })?;

        let permission_ids: BTreeSet<i32> = links.iter().map(|l| l.permission_id).collect();
        let permission_models = if permission_ids.is_empty() {
            Vec::new()
        } else {
            Permissions::find()
                .filter(permissions::Column::Id.is_in(permission_ids))
                .all(conn)
                .await
                .map_err(|e| DatabaseError::Internal {
                    message: format!("Failed to load permissions: {}", e),
                })?
        };
        let by_id: HashMap<i32, permissions::Model> =
            permission_models.into_iter().map(|p| (p.id, p)).collect();

        Ok(role_models
            .into_iter()
            .map(|role| {
                let mut attached: Vec<permissions::Model> = links
                    .iter()
                    .filter(|link| link.role_id == role.id)
                    .filter_map(|link| by_id.get(&link.permission_id).cloned())
                    .collect();
                attached.sort_by_key(|p| p.id);
                to_unified_role(role, attached)
            })
            .collect())
    }
}

#[async_trait]
impl Repository for SeaOrmRoleRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        Roles::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Role repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for SeaOrmRoleRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedRole>, DatabaseError> {
        let conn = self.db.get_connection();
        let model = Roles::find_by_id(id).one(conn).await.map_err(|e| DatabaseError::Internal {
            message: format!("Failed to find role by id: {}", e),
        })?;

        match model {
            Some(model) => {
                let mut unified = Self::attach_permissions(conn, vec![model]).await?;
                Ok(unified.pop())
            }
            None => Ok(None),
        }
    }

    async fn list_for_organization(
        &self,
        organization_id: i32,
        pagination: PaginationInput,
    ) -> Result<ListResponse<UnifiedRole>, DatabaseError> {
        let conn = self.db.get_connection();
        let offset = pagination.get_offset() as u64;
        let limit = pagination.get_limit() as u64;

        let paginator = Roles::find()
            .filter(roles::Column::OrganizationId.eq(organization_id))
            .order_by_asc(roles::Column::Id)
            .paginate(conn, limit);
        let page_number = offset / limit;

        let models = paginator.fetch_page(page_number).await.map_err(|e| DatabaseError::Internal {
            message: format!("Failed to fetch roles: {}", e),
        })?;

        let total = paginator.num_items().await.map_err(|e| DatabaseError::Internal {
            message: format!("Failed to count roles: {}", e),
        })?;

        let items = Self::attach_permissions(conn, models).await?;

        Ok(ListResponse {
            items,
            meta: PaginationMeta::from_window(offset as u32, limit as u32, total),
        })
    }

    async fn create_with_permissions(&self, role: NewRole) -> Result<UnifiedRole, DatabaseError> {
        let txn = self
            .db
            .get_connection()
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to begin role creation: {}", e),
            })?;

        let resolved = Self::resolve_permissions(&txn, &role.permission_ids).await?;
        let now = Utc::now();

        let model = roles::ActiveModel {
            name: Set(role.name),
            description: Set(role.description),
            organization_id: Set(role.organization_id),
            is_system_role: Set(role.is_system_role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_err("Failed to create role", e))?;

        if !resolved.is_empty() {
            let links: Vec<role_permissions::ActiveModel> = resolved
                .iter()
                .map(|permission| role_permissions::ActiveModel {
                    role_id: Set(model.id),
                    permission_id: Set(permission.id),
                })
                .collect();

            RolePermissions::insert_many(links)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| map_write_err("Failed to write permission links", e))?;
        }

        txn.commit().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to commit role creation: {}", e),
        })?;

        Ok(to_unified_role(model, resolved))
    }

    async fn update_with_permissions(&self, role_id: i32, changes: RoleChanges) -> Result<UnifiedRole, DatabaseError> {
        let txn = self
            .db
            .get_connection()
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to begin role update: {}", e),
            })?;

        let existing = Roles::find_by_id(role_id)
            .one(&txn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find role for update: {}", e),
            })?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "role".to_string(),
                id: role_id.to_string(),
            })?;

        let mut active: roles::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&txn)
            .await
            .map_err(|e| map_write_err("Failed to update role", e))?;

        let resolved = match changes.permission_ids {
            Some(ids) => {
                let resolved = Self::resolve_permissions(&txn, &ids).await?;
                Self::replace_permission_links(&txn, role_id, &resolved).await?;
                resolved
            }
            None => {
                let links = RolePermissions::find()
                    .filter(role_permissions::Column::RoleId.eq(role_id))
                    .all(&txn)
                    .await
                    .map_err(|e| DatabaseError::Internal {
                        message: format!("Failed to load permission links: {}", e),
                    })?;
                let ids: Vec<i32> = links.iter().map(|l| l.permission_id).collect();
                Self::resolve_permissions(&txn, &ids).await?
            }
        };

        txn.commit().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to commit role update: {}", e),
        })?;

        Ok(to_unified_role(model, resolved))
    }

    async fn delete_conditional(&self, role_id: i32) -> Result<RoleDeleteOutcome, DatabaseError> {
        let conn = self.db.get_connection();

        // One statement carries all three guards; a role that is a system
        // role or still assigned to anyone is simply not matched.
        let assigned = Query::select()
            .column(user_roles::Column::RoleId)
            .from(user_roles::Entity)
            .to_owned();

        let result = Roles::delete_many()
            .filter(roles::Column::Id.eq(role_id))
            .filter(roles::Column::IsSystemRole.eq(false))
            .filter(roles::Column::Id.not_in_subquery(assigned))
            .exec(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete role: {}", e),
            })?;

        if result.rows_affected == 1 {
            return Ok(RoleDeleteOutcome::Deleted);
        }

        // Nothing was deleted; re-query to report which guard held
        let role = Roles::find_by_id(role_id)
            .one(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to classify role deletion: {}", e),
            })?;

        match role {
            None => Ok(RoleDeleteOutcome::NotFound),
            Some(role) if role.is_system_role => Ok(RoleDeleteOutcome::SystemRole),
            Some(_) => Ok(RoleDeleteOutcome::HasAssignedUsers),
        }
    }

    async fn assign_to_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError> {
        let inserted = UserRoles::insert(user_roles::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
        })
        .on_conflict(
            OnConflict::columns([user_roles::Column::UserId, user_roles::Column::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(self.db.get_connection())
        .await
        .map_err(|e| map_write_err("Failed to assign role", e))?;

        Ok(inserted == 1)
    }

    async fn remove_from_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError> {
        let result = UserRoles::delete_many()
            .filter(user_roles::Column::UserId.eq(user_id))
            .filter(user_roles::Column::RoleId.eq(role_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to remove role: {}", e),
            })?;

        Ok(result.rows_affected == 1)
    }

    async fn roles_for_user(&self, user_id: i32) -> Result<Vec<UnifiedRole>, DatabaseError> {
        let conn = self.db.get_connection();

        let links = UserRoles::find()
            .filter(user_roles::Column::UserId.eq(user_id))
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load role assignments: {}", e),
            })?;

        if links.is_empty() {
            return Ok(Vec::new());
        }

        let role_ids: Vec<i32> = links.iter().map(|l| l.role_id).collect();
        let models = Roles::find()
            .filter(roles::Column::Id.is_in(role_ids))
            .order_by_asc(roles::Column::Id)
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load roles: {}", e),
            })?;

        Self::attach_permissions(conn, models).await
    }

    async fn permission_names_for_user(&self, user_id: i32) -> Result<Vec<String>, DatabaseError> {
        let conn = self.db.get_connection();

        let assignments = UserRoles::find()
            .filter(user_roles::Column::UserId.eq(user_id))
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load role assignments: {}", e),
            })?;

        let role_ids: Vec<i32> = assignments.iter().map(|a| a.role_id).collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let links = RolePermissions::find()
            .filter(role_permissions::Column::RoleId.is_in(role_ids))
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load permission links: {}", e),
            })?;

        let permission_ids: BTreeSet<i32> = links.iter().map(|l| l.permission_id).collect();
        if permission_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Sorted by name so the set is deterministic across logins
        let names = Permissions::find()
            .filter(permissions::Column::Id.is_in(permission_ids))
            .order_by_asc(permissions::Column::Name)
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to load permissions: {}", e),
            })?
            .into_iter()
            .map(|p| p.name)
            .collect();

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDatabase;
    use vigil_interfaces::RepositoryFactory;

    async fn permission_ids(db: &TestDatabase, names: &[&str]) -> Vec<i32> {
        let factory = db.factory();
        let catalog = factory.permission_repository().list_all().await.unwrap();
        names
            .iter()
            .map(|name| {
                catalog
                    .iter()
                    .find(|p| p.name == *name)
                    .unwrap_or_else(|| panic!("missing catalog permission {}", name))
                    .id
                    .as_i32()
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_role_with_permissions() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let ids = permission_ids(&db, &["alerts:read", "alerts:operate"]).await;

        let role = repo
            .create_with_permissions(NewRole {
                name: "Alert Responder".to_string(),
                description: Some("Handles alert traffic".to_string()),
                organization_id: org_id,
                is_system_role: false,
                permission_ids: ids,
            })
            .await
            .unwrap();

        assert_eq!(role.name, "Alert Responder");
        assert!(!role.is_system_role);
        assert_eq!(role.permissions.len(), 2);

        let found = repo.find_by_id(role.id.as_i32().unwrap()).await.unwrap().unwrap();
        assert_eq!(found.permission_names(), role.permission_names());
    }

    #[tokio::test]
    async fn test_create_role_with_unknown_permission_rolls_back() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;

        let err = repo
            .create_with_permissions(NewRole {
                name: "Broken".to_string(),
                description: None,
                organization_id: org_id,
                is_system_role: false,
                permission_ids: vec![99999],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));

        let roles = Roles::find()
            .filter(roles::Column::Name.eq("Broken"))
            .all(db.connection.get_connection())
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_role_name_in_organization_conflicts() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;

        let new_role = |name: &str| NewRole {
            name: name.to_string(),
            description: None,
            organization_id: org_id,
            is_system_role: false,
            permission_ids: vec![],
        };

        repo.create_with_permissions(new_role("Oncall")).await.unwrap();
        let err = repo.create_with_permissions(new_role("Oncall")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint { .. }));

        // Same name in another organization is fine
        let other_org = db.seed_organization("globex").await;
        let mut other = new_role("Oncall");
        other.organization_id = other_org;
        repo.create_with_permissions(other).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_replaces_permission_set() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let initial = permission_ids(&db, &["alerts:read"]).await;
        let replacement = permission_ids(&db, &["logs:read", "metrics:read"]).await;

        let role = repo
            .create_with_permissions(NewRole {
                name: "Observer".to_string(),
                description: None,
                organization_id: org_id,
                is_system_role: false,
                permission_ids: initial,
            })
            .await
            .unwrap();

        let updated = repo
            .update_with_permissions(
                role.id.as_i32().unwrap(),
                RoleChanges {
                    name: Some("Telemetry Observer".to_string()),
                    description: Some("Read-only telemetry".to_string()),
                    permission_ids: Some(replacement),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Telemetry Observer");
        let mut names = updated.permission_names();
        names.sort();
        assert_eq!(names, vec!["logs:read", "metrics:read"]);

        // Omitting permission_ids leaves the set untouched
        let renamed = repo
            .update_with_permissions(
                role.id.as_i32().unwrap(),
                RoleChanges {
                    name: Some("Telemetry".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.permissions.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_role_is_not_found() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());

        let err = repo
            .update_with_permissions(424242, RoleChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_conditional_outcomes() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;

        // Missing role
        assert_eq!(
            repo.delete_conditional(424242).await.unwrap(),
            RoleDeleteOutcome::NotFound
        );

        // System role is protected
        let system_role = roles::ActiveModel {
            name: Set("Admin".to_string()),
            description: Set(None),
            organization_id: Set(org_id),
            is_system_role: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db.connection.get_connection())
        .await
        .unwrap();
        assert_eq!(
            repo.delete_conditional(system_role.id).await.unwrap(),
            RoleDeleteOutcome::SystemRole
        );

        // Assigned role is protected until the assignment goes away
        let custom = repo
            .create_with_permissions(NewRole {
                name: "Deletable".to_string(),
                description: None,
                organization_id: org_id,
                is_system_role: false,
                permission_ids: vec![],
            })
            .await
            .unwrap();
        let role_id = custom.id.as_i32().unwrap();

        assert!(repo.assign_to_user(user_id, role_id).await.unwrap());
        assert_eq!(
            repo.delete_conditional(role_id).await.unwrap(),
            RoleDeleteOutcome::HasAssignedUsers
        );

        assert!(repo.remove_from_user(user_id, role_id).await.unwrap());
        assert_eq!(repo.delete_conditional(role_id).await.unwrap(), RoleDeleteOutcome::Deleted);
        assert!(repo.find_by_id(role_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_assignment_is_idempotent() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;

        let role = repo
            .create_with_permissions(NewRole {
                name: "Oncall".to_string(),
                description: None,
                organization_id: org_id,
                is_system_role: false,
                permission_ids: vec![],
            })
            .await
            .unwrap();
        let role_id = role.id.as_i32().unwrap();

        assert!(repo.assign_to_user(user_id, role_id).await.unwrap());
        assert!(!repo.assign_to_user(user_id, role_id).await.unwrap());

        assert!(repo.remove_from_user(user_id, role_id).await.unwrap());
        assert!(!repo.remove_from_user(user_id, role_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_permission_names_for_user_deduplicates_across_roles() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;

        let first = permission_ids(&db, &["alerts:read", "logs:read"]).await;
        let second = permission_ids(&db, &["alerts:read", "metrics:read"]).await;

        for (name, ids) in [("A", first), ("B", second)] {
            let role = repo
                .create_with_permissions(NewRole {
                    name: name.to_string(),
                    description: None,
                    organization_id: org_id,
                    is_system_role: false,
                    permission_ids: ids,
                })
                .await
                .unwrap();
            repo.assign_to_user(user_id, role.id.as_i32().unwrap()).await.unwrap();
        }

        let names = repo.permission_names_for_user(user_id).await.unwrap();
        assert_eq!(names, vec!["alerts:read", "logs:read", "metrics:read"]);

        let roles = repo.roles_for_user(user_id).await.unwrap();
        assert_eq!(roles.len(), 2);
    }

    #[tokio::test]
    async fn test_list_for_organization_pagination() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRoleRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;

        for i in 0..5 {
            repo.create_with_permissions(NewRole {
                name: format!("Role {}", i),
                description: None,
                organization_id: org_id,
                is_system_role: false,
                permission_ids: vec![],
            })
            .await
            .unwrap();
        }

        let page = repo
            .list_for_organization(
                org_id,
                PaginationInput {
                    page: Some(2),
                    limit: Some(2),
                    offset: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.page, 2);
        assert_eq!(page.meta.total_pages, 3);
        assert!(page.meta.has_next);
        assert!(page.meta.has_previous);
    }
}
