//! User repository implementation using SeaORM

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QuerySelect, Set};
use sea_query::Expr;

use vigil_interfaces::{DatabaseError, LoginFailure, NewUser, Repository, UserRecord, UserRepository};

use crate::connection::DatabaseConnection;
use crate::entities::{users, Users};
use crate::repositories::{map_write_err, to_user_record};

/// SeaORM implementation of the UserRepository
#[derive(Clone)]
pub struct SeaOrmUserRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for SeaOrmUserRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        Users::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("User repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, DatabaseError> {
        let model = Users::find_by_id(id)
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find user by id: {}", e),
            })?;

        Ok(model.map(to_user_record))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let model = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to find user by email: {}", e),
            })?;

        Ok(model.map(to_user_record))
    }

    async fn create(&self, organization_id: i32, user: NewUser) -> Result<UserRecord, DatabaseError> {
        let now = Utc::now();

        let active_model = users::ActiveModel {
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            organization_id: Set(organization_id),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = active_model
            .insert(self.db.get_connection())
            .await
            .map_err(|e| map_write_err("Failed to create user", e))?;

        Ok(to_user_record(result))
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), DatabaseError> {
        let active_model = users::ActiveModel {
            id: Set(user_id),
            password_hash: Set(password_hash.to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        match active_model.update(self.db.get_connection()).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(DatabaseError::NotFound {
                entity: "user".to_string(),
                id: user_id.to_string(),
            }),
            Err(e) => Err(DatabaseError::Internal {
                message: format!("Failed to update password: {}", e),
            }),
        }
    }

    async fn register_failed_login(
        &self,
        user_id: i32,
        threshold: i32,
        lock_duration: Duration,
    ) -> Result<LoginFailure, DatabaseError> {
        let conn = self.db.get_connection();
        let now = Utc::now();

        // Increment in the store so concurrent failures are never lost
        let updated = Users::update_many()
            .col_expr(
                users::Column::FailedLoginAttempts,
                Expr::col(users::Column::FailedLoginAttempts).add(1),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to record login failure: {}", e),
            })?;

        if updated.rows_affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user".to_string(),
                id: user_id.to_string(),
            });
        }

        let model = Users::find_by_id(user_id)
            .one(conn)
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to read back failure count: {}", e),
            })?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "user".to_string(),
                id: user_id.to_string(),
            })?;

        let attempts = model.failed_login_attempts;
        if attempts >= threshold {
            let locked_until = now + lock_duration;

            // Concurrent threshold-crossers both land here; the write is
            // idempotent enough that it doesn't matter who goes last.
            Users::update_many()
                .col_expr(users::Column::LockedUntil, Expr::value(locked_until))
                .col_expr(users::Column::UpdatedAt, Expr::value(now))
                .filter(users::Column::Id.eq(user_id))
                .exec(conn)
                .await
                .map_err(|e| DatabaseError::Internal {
                    message: format!("Failed to set account lock: {}", e),
                })?;

            return Ok(LoginFailure {
                attempts,
                locked_until: Some(locked_until),
            });
        }

        Ok(LoginFailure {
            attempts,
            locked_until: None,
        })
    }

    async fn record_login_success(&self, user_id: i32) -> Result<(), DatabaseError> {
        let now = Utc::now();

        Users::update_many()
            .col_expr(users::Column::FailedLoginAttempts, Expr::value(0))
            .col_expr(users::Column::LockedUntil, Expr::value(None::<chrono::DateTime<Utc>>))
            .col_expr(users::Column::LastLoginAt, Expr::value(now))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to record login success: {}", e),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDatabase;

    async fn seeded_user(db: &TestDatabase) -> UserRecord {
        let repo = SeaOrmUserRepository::new(db.connection.clone());
        let org_id = db.seed_organization("acme").await;
        repo.create(
            org_id,
            NewUser {
                email: "ops@acme.example".to_string(),
                password_hash: "$2b$12$hash".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmUserRepository::new(db.connection.clone());
        let user = seeded_user(&db).await;

        assert_eq!(user.failed_login_attempts, 0);
        assert!(user.locked_until.is_none());

        let by_email = repo.find_by_email("ops@acme.example").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ops@acme.example");

        assert!(repo.find_by_email("nobody@acme.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_constraint_error() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmUserRepository::new(db.connection.clone());
        let user = seeded_user(&db).await;

        let err = repo
            .create(
                user.organization_id,
                NewUser {
                    email: "ops@acme.example".to_string(),
                    password_hash: "$2b$12$other".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::Constraint { .. }));
    }

    #[tokio::test]
    async fn test_failed_logins_lock_at_threshold() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmUserRepository::new(db.connection.clone());
        let user = seeded_user(&db).await;

        for expected in 1..=4 {
            let failure = repo
                .register_failed_login(user.id, 5, Duration::minutes(15))
                .await
                .unwrap();
            assert_eq!(failure.attempts, expected);
            assert!(failure.locked_until.is_none());
        }

        let fifth = repo
            .register_failed_login(user.id, 5, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(fifth.attempts, 5);
        let locked_until = fifth.locked_until.expect("fifth failure should lock");
        assert!(locked_until > Utc::now());

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert_eq!(stored.locked_until, Some(locked_until));
    }

    #[tokio::test]
    async fn test_login_success_clears_failures_and_lock() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmUserRepository::new(db.connection.clone());
        let user = seeded_user(&db).await;

        for _ in 0..5 {
            repo.register_failed_login(user.id, 5, Duration::minutes(15)).await.unwrap();
        }

        repo.record_login_success(user.id).await.unwrap();

        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
        assert!(stored.locked_until.is_none());
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_update_password_for_missing_user() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmUserRepository::new(db.connection.clone());

        let err = repo.update_password(9999, "$2b$12$new").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
