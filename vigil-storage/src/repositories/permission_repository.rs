//! Permission catalog repository implementation using SeaORM
//!
//! The catalog is read-only at runtime; rows come from the seed
//! migration.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use vigil_api_types::UnifiedPermission;
use vigil_interfaces::{DatabaseError, PermissionRepository, Repository};

use crate::connection::DatabaseConnection;
use crate::entities::{permissions, Permissions};
use crate::repositories::to_unified_permission;

/// SeaORM implementation of the PermissionRepository
#[derive(Clone)]
pub struct SeaOrmPermissionRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmPermissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for SeaOrmPermissionRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        Permissions::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Permission repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for SeaOrmPermissionRepository {
    async fn list_all(&self) -> Result<Vec<UnifiedPermission>, DatabaseError> {
        let models = Permissions::find()
            .order_by_asc(permissions::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to list permissions: {}", e),
            })?;

        Ok(models.into_iter().map(to_unified_permission).collect())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<UnifiedPermission>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = Permissions::find()
            .filter(permissions::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(permissions::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find permissions by id: {}", e),
            })?;

        Ok(models.into_iter().map(to_unified_permission).collect())
    }

    async fn find_by_names(&self, names: &[String]) -> Result<Vec<UnifiedPermission>, DatabaseError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let models = Permissions::find()
            .filter(permissions::Column::Name.is_in(names.iter().cloned()))
            .order_by_asc(permissions::Column::Id)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find permissions by name: {}", e),
            })?;

        Ok(models.into_iter().map(to_unified_permission).collect())
    }
}
