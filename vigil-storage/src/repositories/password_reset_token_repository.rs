//! Password reset token repository implementation using SeaORM
//!
//! Tokens are single-use. Consumption is a guarded update on the
//! `used` flag so concurrent redemptions cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use sea_query::Expr;

use vigil_interfaces::{
    DatabaseError, NewPasswordResetToken, PasswordResetTokenRecord, PasswordResetTokenRepository, Repository,
};

use crate::connection::DatabaseConnection;
use crate::entities::{password_reset_tokens, PasswordResetTokens};
use crate::repositories::map_write_err;

/// SeaORM implementation of the PasswordResetTokenRepository
#[derive(Clone)]
pub struct SeaOrmPasswordResetTokenRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmPasswordResetTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn to_token_record(model: password_reset_tokens::Model) -> PasswordResetTokenRecord {
        PasswordResetTokenRecord {
            id: model.id,
            user_id: model.user_id,
            token_hash: model.token_hash,
            expires_at: model.expires_at,
            used: model.used,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl Repository for SeaOrmPasswordResetTokenRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        PasswordResetTokens::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Password reset token repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl PasswordResetTokenRepository for SeaOrmPasswordResetTokenRepository {
    async fn create(&self, token: NewPasswordResetToken) -> Result<PasswordResetTokenRecord, DatabaseError> {
        let active_model = password_reset_tokens::ActiveModel {
            user_id: Set(token.user_id),
            token_hash: Set(token.token_hash),
            expires_at: Set(token.expires_at),
            used: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = active_model
            .insert(self.db.get_connection())
            .await
            .map_err(|e| map_write_err("Failed to create password reset token", e))?;

        Ok(Self::to_token_record(result))
    }

    async fn find_valid_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetTokenRecord>, DatabaseError> {
        let model = PasswordResetTokens::find()
            .filter(password_reset_tokens::Column::TokenHash.eq(token_hash))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .filter(password_reset_tokens::Column::ExpiresAt.gt(Utc::now()))
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find password reset token: {}", e),
            })?;

        Ok(model.map(Self::to_token_record))
    }

    async fn mark_used(&self, id: i32) -> Result<bool, DatabaseError> {
        // Guarded flip: only one caller ever observes an affected row
        let result = PasswordResetTokens::update_many()
            .col_expr(password_reset_tokens::Column::Used, Expr::value(true))
            .filter(password_reset_tokens::Column::Id.eq(id))
            .filter(password_reset_tokens::Column::Used.eq(false))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to consume password reset token: {}", e),
            })?;

        Ok(result.rows_affected == 1)
    }
}
