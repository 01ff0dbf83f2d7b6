//! SeaORM repository implementations
//!
//! One repository per aggregate, each implementing its
//! `vigil-interfaces` trait against the shared connection pool. The
//! factory below owns one instance of each and hands them out as trait
//! objects.

pub mod api_key_repository;
pub mod organization_repository;
pub mod password_reset_token_repository;
pub mod permission_repository;
pub mod rate_limit_repository;
pub mod refresh_token_repository;
pub mod role_repository;
pub mod user_repository;

use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};

use vigil_api_types::ApiId;
use vigil_interfaces::{
    ApiKeyRepository, DatabaseError, OrganizationRepository, PasswordResetTokenRepository, PermissionRepository,
    RateLimitRepository, RefreshTokenRepository, Repository, RepositoryFactory, RoleRepository, UserRecord,
    UserRepository,
};

use crate::connection::DatabaseConnection;
use crate::entities::{permissions, roles, users};

pub use api_key_repository::SeaOrmApiKeyRepository;
pub use organization_repository::SeaOrmOrganizationRepository;
pub use password_reset_token_repository::SeaOrmPasswordResetTokenRepository;
pub use permission_repository::SeaOrmPermissionRepository;
pub use rate_limit_repository::SeaOrmRateLimitRepository;
pub use refresh_token_repository::SeaOrmRefreshTokenRepository;
pub use role_repository::SeaOrmRoleRepository;
pub use user_repository::SeaOrmUserRepository;

/// Map a write error, surfacing constraint violations so callers can
/// turn duplicates into conflict responses instead of 500s.
pub(crate) fn map_write_err(context: &str, e: DbErr) -> DatabaseError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => DatabaseError::Constraint { message },
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => DatabaseError::Constraint { message },
        _ => DatabaseError::Internal {
            message: format!("{}: {}", context, e),
        },
    }
}

/// Convert a user row to the internal record used by the auth services
pub(crate) fn to_user_record(model: users::Model) -> UserRecord {
    UserRecord {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        organization_id: model.organization_id,
        failed_login_attempts: model.failed_login_attempts,
        locked_until: model.locked_until,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Convert a permission row to the unified domain type
pub(crate) fn to_unified_permission(model: permissions::Model) -> vigil_api_types::UnifiedPermission {
    vigil_api_types::UnifiedPermission {
        id: ApiId::from_i32(model.id),
        name: model.name,
        resource: model.resource,
        action: model.action,
        description: model.description,
    }
}

/// Convert a role row plus its resolved permission rows to the unified
/// domain type
pub(crate) fn to_unified_role(model: roles::Model, permissions: Vec<permissions::Model>) -> vigil_api_types::UnifiedRole {
    vigil_api_types::UnifiedRole {
        id: ApiId::from_i32(model.id),
        name: model.name,
        description: model.description,
        organization_id: ApiId::from_i32(model.organization_id),
        is_system_role: model.is_system_role,
        permissions: permissions.into_iter().map(to_unified_permission).collect(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Repository factory holding one repository per aggregate
#[derive(Clone)]
pub struct SeaOrmRepositoryFactory {
    user_repository: SeaOrmUserRepository,
    organization_repository: SeaOrmOrganizationRepository,
    role_repository: SeaOrmRoleRepository,
    permission_repository: SeaOrmPermissionRepository,
    refresh_token_repository: SeaOrmRefreshTokenRepository,
    password_reset_token_repository: SeaOrmPasswordResetTokenRepository,
    api_key_repository: SeaOrmApiKeyRepository,
    rate_limit_repository: SeaOrmRateLimitRepository,
}

impl SeaOrmRepositoryFactory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repository: SeaOrmUserRepository::new(db.clone()),
            organization_repository: SeaOrmOrganizationRepository::new(db.clone()),
            role_repository: SeaOrmRoleRepository::new(db.clone()),
            permission_repository: SeaOrmPermissionRepository::new(db.clone()),
            refresh_token_repository: SeaOrmRefreshTokenRepository::new(db.clone()),
            password_reset_token_repository: SeaOrmPasswordResetTokenRepository::new(db.clone()),
            api_key_repository: SeaOrmApiKeyRepository::new(db.clone()),
            rate_limit_repository: SeaOrmRateLimitRepository::new(db),
        }
    }
}

#[async_trait]
impl RepositoryFactory for SeaOrmRepositoryFactory {
    fn user_repository(&self) -> &dyn UserRepository {
        &self.user_repository
    }

    fn organization_repository(&self) -> &dyn OrganizationRepository {
        &self.organization_repository
    }

    fn role_repository(&self) -> &dyn RoleRepository {
        &self.role_repository
    }

    fn permission_repository(&self) -> &dyn PermissionRepository {
        &self.permission_repository
    }

    fn refresh_token_repository(&self) -> &dyn RefreshTokenRepository {
        &self.refresh_token_repository
    }

    fn password_reset_token_repository(&self) -> &dyn PasswordResetTokenRepository {
        &self.password_reset_token_repository
    }

    fn api_key_repository(&self) -> &dyn ApiKeyRepository {
        &self.api_key_repository
    }

    fn rate_limit_repository(&self) -> &dyn RateLimitRepository {
        &self.rate_limit_repository
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Repository::health_check(&self.user_repository).await?;
        Repository::health_check(&self.organization_repository).await?;
        Repository::health_check(&self.role_repository).await?;
        Repository::health_check(&self.permission_repository).await?;
        Repository::health_check(&self.refresh_token_repository).await?;
        Repository::health_check(&self.password_reset_token_repository).await?;
        Repository::health_check(&self.api_key_repository).await?;
        Repository::health_check(&self.rate_limit_repository).await?;
        Ok(())
    }
}
