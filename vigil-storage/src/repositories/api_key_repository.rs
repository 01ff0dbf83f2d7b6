//! API key repository implementation using SeaORM

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use sea_query::Expr;

use vigil_api_types::{ApiId, UnifiedApiKey};
use vigil_interfaces::{ApiKeyRepository, DatabaseError, NewApiKey, Repository};

use crate::connection::DatabaseConnection;
use crate::entities::{api_keys, ApiKeys};
use crate::repositories::map_write_err;

/// SeaORM implementation of the ApiKeyRepository
#[derive(Clone)]
pub struct SeaOrmApiKeyRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmApiKeyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Convert SeaORM API key model to unified domain type
    fn to_unified_api_key(model: api_keys::Model) -> UnifiedApiKey {
        let scoped_permissions: Vec<String> = serde_json::from_value(model.scoped_permissions).unwrap_or_default();

        UnifiedApiKey {
            id: ApiId::from_i32(model.id),
            name: model.name,
            user_id: ApiId::from_i32(model.user_id),
            organization_id: ApiId::from_i32(model.organization_id),
            key_prefix: model.key_prefix,
            scoped_permissions,
            expires_at: model.expires_at,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
        }
    }
}

#[async_trait]
impl Repository for SeaOrmApiKeyRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        ApiKeys::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("API key repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ApiKeyRepository for SeaOrmApiKeyRepository {
    async fn create(&self, key: NewApiKey) -> Result<UnifiedApiKey, DatabaseError> {
        let scoped = serde_json::to_value(&key.scoped_permissions).map_err(|e| DatabaseError::Internal {
            message: format!("Failed to encode permission snapshot: {}", e),
        })?;

        let active_model = api_keys::ActiveModel {
            key_hash: Set(key.key_hash),
            name: Set(key.name),
            key_prefix: Set(key.key_prefix),
            user_id: Set(key.user_id),
            organization_id: Set(key.organization_id),
            scoped_permissions: Set(scoped),
            expires_at: Set(key.expires_at),
            created_at: Set(Utc::now()),
            last_used_at: Set(None),
            ..Default::default()
        };

        let result = active_model
            .insert(self.db.get_connection())
            .await
            .map_err(|e| map_write_err("Failed to create API key", e))?;

        Ok(Self::to_unified_api_key(result))
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<UnifiedApiKey>, DatabaseError> {
        let model = ApiKeys::find()
            .filter(api_keys::Column::KeyHash.eq(key_hash))
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find API key by hash: {}", e),
            })?;

        Ok(model.map(Self::to_unified_api_key))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedApiKey>, DatabaseError> {
        let models = ApiKeys::find()
            .filter(api_keys::Column::UserId.eq(user_id))
            .order_by_desc(api_keys::Column::CreatedAt)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to list API keys: {}", e),
            })?;

        Ok(models.into_iter().map(Self::to_unified_api_key).collect())
    }

    async fn touch_last_used(&self, key_id: i32) -> Result<(), DatabaseError> {
        ApiKeys::update_many()
            .col_expr(api_keys::Column::LastUsedAt, Expr::value(Utc::now()))
            .filter(api_keys::Column::Id.eq(key_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to update API key last_used: {}", e),
            })?;

        Ok(())
    }

    async fn delete(&self, key_id: i32) -> Result<u64, DatabaseError> {
        let result = ApiKeys::delete_by_id(key_id)
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete API key: {}", e),
            })?;

        Ok(result.rows_affected)
    }

    async fn delete_for_user(&self, key_id: i32, user_id: i32) -> Result<u64, DatabaseError> {
        let result = ApiKeys::delete_many()
            .filter(api_keys::Column::Id.eq(key_id))
            .filter(api_keys::Column::UserId.eq(user_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete API key: {}", e),
            })?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::testing::TestDatabase;

    fn new_key(user_id: i32, organization_id: i32, hash: &str) -> NewApiKey {
        NewApiKey {
            name: "deploy bot".to_string(),
            key_hash: hash.to_string(),
            key_prefix: "sk_0000002a".to_string(),
            user_id,
            organization_id,
            scoped_permissions: vec!["containers:read".to_string(), "containers:operate".to_string()],
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_by_hash() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmApiKeyRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;

        let created = repo.create(new_key(user_id, org_id, "digest")).await.unwrap();
        assert_eq!(created.key_prefix, "sk_0000002a");
        assert_eq!(
            created.scoped_permissions,
            vec!["containers:read".to_string(), "containers:operate".to_string()]
        );
        assert!(created.last_used_at.is_none());

        let found = repo.find_by_hash("digest").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.scoped_permissions, created.scoped_permissions);

        assert!(repo.find_by_hash("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_keys_are_still_returned_by_hash() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmApiKeyRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;

        let mut key = new_key(user_id, org_id, "expired");
        key.expires_at = Some(Utc::now() - Duration::hours(1));
        repo.create(key).await.unwrap();

        // The caller tells expired apart from unknown, so the row comes back
        let found = repo.find_by_hash("expired").await.unwrap().unwrap();
        assert!(found.expires_at.unwrap() < Utc::now());
    }

    #[tokio::test]
    async fn test_touch_and_scoped_delete() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmApiKeyRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;
        let other_user = db.seed_user(org_id, "dev@acme.example").await;

        let created = repo.create(new_key(user_id, org_id, "digest")).await.unwrap();
        let key_id = created.id.as_i32().unwrap();

        repo.touch_last_used(key_id).await.unwrap();
        let touched = repo.find_by_hash("digest").await.unwrap().unwrap();
        assert!(touched.last_used_at.is_some());

        assert_eq!(repo.delete_for_user(key_id, other_user).await.unwrap(), 0);
        assert_eq!(repo.delete_for_user(key_id, user_id).await.unwrap(), 1);
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }
}
