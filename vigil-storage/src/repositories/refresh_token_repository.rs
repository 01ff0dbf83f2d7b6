//! Refresh token repository implementation using SeaORM
//!
//! Expiry is part of the lookup predicate, so an expired token is
//! indistinguishable from an absent one. Deletion returns the affected
//! row count; rotation uses that count to arbitrate concurrent
//! redemptions of the same secret.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

use vigil_api_types::{ApiId, UnifiedSession};
use vigil_interfaces::{DatabaseError, NewRefreshToken, RefreshTokenRecord, RefreshTokenRepository, Repository};

use crate::connection::DatabaseConnection;
use crate::entities::{refresh_tokens, RefreshTokens};
use crate::repositories::map_write_err;

/// SeaORM implementation of the RefreshTokenRepository
#[derive(Clone)]
pub struct SeaOrmRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmRefreshTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn to_token_record(model: refresh_tokens::Model) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: model.id,
            user_id: model.user_id,
            token_hash: model.token_hash,
            device_info: model.device_info,
            expires_at: model.expires_at,
            created_at: model.created_at,
        }
    }

    fn to_unified_session(model: refresh_tokens::Model) -> UnifiedSession {
        UnifiedSession {
            id: ApiId::from_i32(model.id),
            user_id: ApiId::from_i32(model.user_id),
            device_info: model.device_info,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }
}

#[async_trait]
impl Repository for SeaOrmRefreshTokenRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        RefreshTokens::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Refresh token repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for SeaOrmRefreshTokenRepository {
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, DatabaseError> {
        let active_model = refresh_tokens::ActiveModel {
            user_id: Set(token.user_id),
            token_hash: Set(token.token_hash),
            device_info: Set(token.device_info),
            expires_at: Set(token.expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = active_model
            .insert(self.db.get_connection())
            .await
            .map_err(|e| map_write_err("Failed to create refresh token", e))?;

        Ok(Self::to_token_record(result))
    }

    async fn find_valid_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let model = RefreshTokens::find()
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .filter(refresh_tokens::Column::ExpiresAt.gt(Utc::now()))
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find refresh token by hash: {}", e),
            })?;

        Ok(model.map(Self::to_token_record))
    }

    async fn delete_by_id(&self, id: i32) -> Result<u64, DatabaseError> {
        let result = RefreshTokens::delete_by_id(id)
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete refresh token: {}", e),
            })?;

        Ok(result.rows_affected)
    }

    async fn delete_by_id_for_user(&self, id: i32, user_id: i32) -> Result<u64, DatabaseError> {
        let result = RefreshTokens::delete_many()
            .filter(refresh_tokens::Column::Id.eq(id))
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete refresh token: {}", e),
            })?;

        Ok(result.rows_affected)
    }

    async fn delete_all_for_user(&self, user_id: i32) -> Result<u64, DatabaseError> {
        let result = RefreshTokens::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to delete refresh tokens: {}", e),
            })?;

        Ok(result.rows_affected)
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedSession>, DatabaseError> {
        let models = RefreshTokens::find()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::ExpiresAt.gt(Utc::now()))
            .order_by_desc(refresh_tokens::Column::CreatedAt)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to list sessions: {}", e),
            })?;

        Ok(models.into_iter().map(Self::to_unified_session).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::testing::TestDatabase;

    async fn seeded(db: &TestDatabase) -> (SeaOrmRefreshTokenRepository, i32) {
        let repo = SeaOrmRefreshTokenRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        let user_id = db.seed_user(org_id, "ops@acme.example").await;
        (repo, user_id)
    }

    fn new_token(user_id: i32, hash: &str, ttl: Duration) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token_hash: hash.to_string(),
            device_info: Some("cli".to_string()),
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn test_expired_tokens_are_invisible() {
        let db = TestDatabase::new().await.unwrap();
        let (repo, user_id) = seeded(&db).await;

        repo.create(new_token(user_id, "live", Duration::days(7))).await.unwrap();
        repo.create(new_token(user_id, "dead", Duration::seconds(-1))).await.unwrap();

        assert!(repo.find_valid_by_hash("live").await.unwrap().is_some());
        assert!(repo.find_valid_by_hash("dead").await.unwrap().is_none());

        let sessions = repo.list_for_user(user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].device_info.as_deref(), Some("cli"));
    }

    #[tokio::test]
    async fn test_delete_count_arbitrates_rotation() {
        let db = TestDatabase::new().await.unwrap();
        let (repo, user_id) = seeded(&db).await;

        let record = repo.create(new_token(user_id, "rotating", Duration::days(7))).await.unwrap();

        // First redemption wins the row, the second observes zero
        assert_eq!(repo.delete_by_id(record.id).await.unwrap(), 1);
        assert_eq!(repo.delete_by_id(record.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scoped_deletes_respect_ownership() {
        let db = TestDatabase::new().await.unwrap();
        let (repo, user_id) = seeded(&db).await;
        let org_id = db.seed_organization("globex").await;
        let other_user = db.seed_user(org_id, "other@globex.example").await;

        let record = repo.create(new_token(user_id, "mine", Duration::days(7))).await.unwrap();

        assert_eq!(repo.delete_by_id_for_user(record.id, other_user).await.unwrap(), 0);
        assert_eq!(repo.delete_by_id_for_user(record.id, user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let db = TestDatabase::new().await.unwrap();
        let (repo, user_id) = seeded(&db).await;

        repo.create(new_token(user_id, "one", Duration::days(7))).await.unwrap();
        repo.create(new_token(user_id, "two", Duration::days(7))).await.unwrap();

        assert_eq!(repo.delete_all_for_user(user_id).await.unwrap(), 2);
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }
}
