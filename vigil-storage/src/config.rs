use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Database configuration for the SeaORM connection pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of idle connections to keep open
    pub min_connections: u32,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Idle timeout before a pooled connection is closed
    pub idle_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl StorageConfig {
    /// Configuration for an isolated in-memory database.
    ///
    /// The pool is capped at a single connection because every pooled
    /// connection to `sqlite::memory:` opens its own private database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connection_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}
