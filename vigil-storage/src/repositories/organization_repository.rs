//! Organization repository implementation using SeaORM
//!
//! Organization creation is a bootstrap transaction: the organization
//! row, its system roles with their permission grants, the first user
//! and that user's role assignments all commit together or not at all.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait};

use vigil_api_types::{ApiId, UnifiedOrganization, UnifiedRole};
use vigil_interfaces::{
    DatabaseError, NewUser, OrganizationBootstrap, OrganizationRepository, Repository, SystemRoleSeed,
};

use crate::connection::DatabaseConnection;
use crate::entities::{
    organizations, permissions, role_permissions, roles, user_roles, users, Organizations, Permissions,
    RolePermissions, UserRoles,
};
use crate::repositories::{map_write_err, to_unified_role, to_user_record};

/// SeaORM implementation of the OrganizationRepository
#[derive(Clone)]
pub struct SeaOrmOrganizationRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmOrganizationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Convert SeaORM organization model to unified domain type
    fn to_unified_organization(model: organizations::Model) -> UnifiedOrganization {
        UnifiedOrganization {
            id: ApiId::from_i32(model.id),
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Insert one seeded role with its permission grants and optional
    /// owner assignment
    async fn seed_role<C: ConnectionTrait>(
        conn: &C,
        organization_id: i32,
        owner_id: i32,
        seed: SystemRoleSeed,
    ) -> Result<UnifiedRole, DatabaseError> {
        let now = Utc::now();

        let role = roles::ActiveModel {
            name: Set(seed.name),
            description: Set(Some(seed.description)),
            organization_id: Set(organization_id),
            is_system_role: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| map_write_err("Failed to seed system role", e))?;

        let resolved = Permissions::find()
            .filter(permissions::Column::Name.is_in(seed.permission_names.clone()))
            .order_by_asc(permissions::Column::Id)
            .all(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to resolve seed permissions: {}", e),
            })?;

        if resolved.len() != seed.permission_names.len() {
            return Err(DatabaseError::Validation {
                message: format!("Unknown permission name in seed for role '{}'", role.name),
            });
        }

        if !resolved.is_empty() {
            let links: Vec<role_permissions::ActiveModel> = resolved
                .iter()
                .map(|permission| role_permissions::ActiveModel {
                    role_id: Set(role.id),
                    permission_id: Set(permission.id),
                })
                .collect();

            RolePermissions::insert_many(links)
                .exec_without_returning(conn)
                .await
                .map_err(|e| map_write_err("Failed to grant seed permissions", e))?;
        }

        if seed.assign_to_owner {
            UserRoles::insert(user_roles::ActiveModel {
                user_id: Set(owner_id),
                role_id: Set(role.id),
            })
            .exec_without_returning(conn)
            .await
            .map_err(|e| map_write_err("Failed to assign seed role to owner", e))?;
        }

        Ok(to_unified_role(role, resolved))
    }
}

#[async_trait]
impl Repository for SeaOrmOrganizationRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        Organizations::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Organization repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl OrganizationRepository for SeaOrmOrganizationRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedOrganization>, DatabaseError> {
        let model = Organizations::find_by_id(id)
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find organization by id: {}", e),
            })?;

        Ok(model.map(Self::to_unified_organization))
    }

    async fn create_with_owner(
        &self,
        name: &str,
        owner: NewUser,
        system_roles: Vec<SystemRoleSeed>,
    ) -> Result<OrganizationBootstrap, DatabaseError> {
        let txn = self
            .db
            .get_connection()
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to begin bootstrap transaction: {}", e),
            })?;

        let now = Utc::now();

        let organization = organizations::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_err("Failed to create organization", e))?;

        let owner = users::ActiveModel {
            email: Set(owner.email),
            password_hash: Set(owner.password_hash),
            organization_id: Set(organization.id),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_err("Failed to create organization owner", e))?;

        let mut roles = Vec::with_capacity(system_roles.len());
        for seed in system_roles {
            let role = Self::seed_role(&txn, organization.id, owner.id, seed).await?;
            roles.push(role);
        }

        txn.commit().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to commit bootstrap transaction: {}", e),
        })?;

        Ok(OrganizationBootstrap {
            organization: Self::to_unified_organization(organization),
            owner: to_user_record(owner),
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{system_role_seeds, TestDatabase};

    #[tokio::test]
    async fn test_bootstrap_creates_everything_in_one_commit() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmOrganizationRepository::new(db.connection.clone());

        let bootstrap = repo
            .create_with_owner(
                "acme",
                NewUser {
                    email: "founder@acme.example".to_string(),
                    password_hash: "$2b$12$hash".to_string(),
                },
                system_role_seeds(),
            )
            .await
            .unwrap();

        assert_eq!(bootstrap.organization.name, "acme");
        assert_eq!(bootstrap.owner.email, "founder@acme.example");
        assert_eq!(bootstrap.roles.len(), 3);

        let admin = bootstrap.roles.iter().find(|r| r.name == "Admin").unwrap();
        assert!(admin.is_system_role);
        assert_eq!(admin.permissions.len(), 15);

        let viewer = bootstrap.roles.iter().find(|r| r.name == "Viewer").unwrap();
        assert!(viewer.permissions.iter().all(|p| p.action == "read"));

        // The owner got exactly the seeds marked assign_to_owner
        let links = UserRoles::find()
            .filter(user_roles::Column::UserId.eq(bootstrap.owner.id))
            .all(db.connection.get_connection())
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].role_id, admin.id.as_i32().unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_rolls_back_on_unknown_permission() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmOrganizationRepository::new(db.connection.clone());

        let mut seeds = system_role_seeds();
        seeds[0].permission_names.push("nonexistent:permission".to_string());

        let err = repo
            .create_with_owner(
                "acme",
                NewUser {
                    email: "founder@acme.example".to_string(),
                    password_hash: "$2b$12$hash".to_string(),
                },
                seeds,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));

        // Nothing from the failed bootstrap is observable
        let orgs = Organizations::find().all(db.connection.get_connection()).await.unwrap();
        assert!(orgs.is_empty());
        let users = crate::entities::Users::find()
            .all(db.connection.get_connection())
            .await
            .unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_duplicate_owner_email_rolls_back_organization() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmOrganizationRepository::new(db.connection.clone());

        repo.create_with_owner(
            "first",
            NewUser {
                email: "founder@acme.example".to_string(),
                password_hash: "$2b$12$hash".to_string(),
            },
            system_role_seeds(),
        )
        .await
        .unwrap();

        let err = repo
            .create_with_owner(
                "second",
                NewUser {
                    email: "founder@acme.example".to_string(),
                    password_hash: "$2b$12$hash".to_string(),
                },
                system_role_seeds(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint { .. }));

        let orgs = Organizations::find().all(db.connection.get_connection()).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name, "first");
    }
}
