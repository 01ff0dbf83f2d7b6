//! Rate-limit window repository implementation using SeaORM
//!
//! One row per limiter key, guarded by the unique key column. The
//! service decides when a window is stale; this layer only provides
//! conflict-tolerant inserts and atomic increments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use sea_query::{Expr, OnConflict};

use vigil_interfaces::{DatabaseError, RateLimitRepository, RateWindow, Repository};

use crate::connection::DatabaseConnection;
use crate::entities::{rate_limits, RateLimits};
use crate::repositories::map_write_err;

/// SeaORM implementation of the RateLimitRepository
#[derive(Clone)]
pub struct SeaOrmRateLimitRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmRateLimitRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for SeaOrmRateLimitRepository {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        // Simple connection check
        RateLimits::find()
            .limit(1)
            .all(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Rate limit repository health check failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitRepository for SeaOrmRateLimitRepository {
    async fn fetch(&self, key: &str) -> Result<Option<RateWindow>, DatabaseError> {
        let model = RateLimits::find()
            .filter(rate_limits::Column::Key.eq(key))
            .one(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to fetch rate limit window: {}", e),
            })?;

        Ok(model.map(|m| RateWindow {
            requests: m.requests,
            window_start: m.window_start,
        }))
    }

    async fn create_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let inserted = RateLimits::insert(rate_limits::ActiveModel {
            key: Set(key.to_string()),
            requests: Set(1),
            window_start: Set(window_start),
            ..Default::default()
        })
        .on_conflict(OnConflict::column(rate_limits::Column::Key).do_nothing().to_owned())
        .exec_without_returning(self.db.get_connection())
        .await
        .map_err(|e| map_write_err("Failed to create rate limit window", e))?;

        Ok(inserted == 1)
    }

    async fn reset_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<(), DatabaseError> {
        RateLimits::update_many()
            .col_expr(rate_limits::Column::Requests, Expr::value(1))
            .col_expr(rate_limits::Column::WindowStart, Expr::value(window_start))
            .filter(rate_limits::Column::Key.eq(key))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to reset rate limit window: {}", e),
            })?;

        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<(), DatabaseError> {
        RateLimits::update_many()
            .col_expr(
                rate_limits::Column::Requests,
                Expr::col(rate_limits::Column::Requests).add(1),
            )
            .filter(rate_limits::Column::Key.eq(key))
            .exec(self.db.get_connection())
            .await
            .map_err(|e| DatabaseError::Internal {
                message: format!("Failed to increment rate limit window: {}", e),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::testing::TestDatabase;

    #[tokio::test]
    async fn test_window_lifecycle() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRateLimitRepository::new(db.connection.clone());
        let start = Utc::now();

        assert!(repo.fetch("api:10.0.0.1").await.unwrap().is_none());

        assert!(repo.create_window("api:10.0.0.1", start).await.unwrap());
        let window = repo.fetch("api:10.0.0.1").await.unwrap().unwrap();
        assert_eq!(window.requests, 1);

        repo.increment("api:10.0.0.1").await.unwrap();
        repo.increment("api:10.0.0.1").await.unwrap();
        let window = repo.fetch("api:10.0.0.1").await.unwrap().unwrap();
        assert_eq!(window.requests, 3);

        let new_start = start + Duration::seconds(60);
        repo.reset_window("api:10.0.0.1", new_start).await.unwrap();
        let window = repo.fetch("api:10.0.0.1").await.unwrap().unwrap();
        assert_eq!(window.requests, 1);
        assert_eq!(window.window_start, new_start);
    }

    #[tokio::test]
    async fn test_duplicate_window_insert_reports_conflict() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRateLimitRepository::new(db.connection.clone());
        let start = Utc::now();

        assert!(repo.create_window("auth:10.0.0.1", start).await.unwrap());
        // A second insert for the same key loses the race and reports it
        assert!(!repo.create_window("auth:10.0.0.1", start).await.unwrap());

        // The original window is untouched
        let window = repo.fetch("auth:10.0.0.1").await.unwrap().unwrap();
        assert_eq!(window.requests, 1);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let db = TestDatabase::new().await.unwrap();
        let repo = SeaOrmRateLimitRepository::new(db.connection.clone());
        let start = Utc::now();

        repo.create_window("api:a", start).await.unwrap();
        repo.create_window("api:b", start).await.unwrap();
        repo.increment("api:a").await.unwrap();

        assert_eq!(repo.fetch("api:a").await.unwrap().unwrap().requests, 2);
        assert_eq!(repo.fetch("api:b").await.unwrap().unwrap().requests, 1);
    }
}
