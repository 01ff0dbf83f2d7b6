use crate::config::StorageConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection as SeaConnection, DbErr};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Database connection wrapper with configuration
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
    config: StorageConfig,
}

/// Errors raised while opening, migrating or closing the database
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DbError(#[from] DbErr),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DatabaseConnection {
    /// Create a new database connection with configuration
    pub async fn new(config: StorageConfig) -> Result<Self, StorageError> {
        info!("Connecting to database: {}", config.url);

        // Handle SQLite file creation if needed
        Self::ensure_sqlite_file_exists(&config.url)?;

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(config.connection_timeout)
            .acquire_timeout(config.connection_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(Duration::from_secs(3600))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);

        let connection = Database::connect(opts).await?;

        debug!(
            "Database connection established with {} max connections",
            config.max_connections
        );

        Ok(Self { connection, config })
    }

    /// Ensure SQLite database file and directory exist for file-based databases
    fn ensure_sqlite_file_exists(database_url: &str) -> Result<(), StorageError> {
        if database_url.starts_with("sqlite:") && !database_url.contains(":memory:") {
            // Strip the scheme, handling both sqlite:// and sqlite: forms
            let raw_path = database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .ok_or_else(|| {
                    StorageError::ConfigError(format!("Invalid SQLite URL format: {}", database_url))
                })?;

            // Drop query parameters such as ?mode=rwc
            let file_path = raw_path.split('?').next().unwrap_or(raw_path);
            let path = std::path::Path::new(file_path);

            // Create parent directory if it doesn't exist
            if let Some(parent_dir) = path.parent() {
                if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                    info!("Creating database directory: {:?}", parent_dir);
                    std::fs::create_dir_all(parent_dir).map_err(|e| {
                        StorageError::ConfigError(format!(
                            "Failed to create database directory {:?}: {}",
                            parent_dir, e
                        ))
                    })?;
                }
            }

            if !path.exists() {
                info!("Database file will be created by SQLite: {:?}", path);
            } else {
                debug!("Using existing database file: {:?}", path);
            }
        } else if database_url.contains(":memory:") {
            debug!("Using in-memory SQLite database");
        } else {
            debug!("Non-SQLite database detected, skipping file creation logic");
        }

        Ok(())
    }

    /// Get the underlying Sea-ORM connection
    pub fn get_connection(&self) -> &SeaConnection {
        &self.connection
    }

    /// Get database configuration
    pub fn get_config(&self) -> &StorageConfig {
        &self.config
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StorageError> {
        use sea_orm_migration::MigratorTrait;

        info!("Running database migrations");

        crate::migrations::Migrator::up(&self.connection, None)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Check database connectivity
    pub async fn ping(&self) -> Result<(), StorageError> {
        debug!("Pinging database");

        match self.connection.ping().await {
            Ok(_) => {
                debug!("Database ping successful");
                Ok(())
            }
            Err(e) => {
                debug!("Database ping failed: {}", e);
                Err(StorageError::DbError(e))
            }
        }
    }

    /// Close the database connection
    pub async fn close(self) -> Result<(), StorageError> {
        info!("Closing database connection");
        self.connection.close().await?;
        debug!("Database connection closed");
        Ok(())
    }
}
