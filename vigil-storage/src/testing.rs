//! Shared database testing utilities
//!
//! Every test gets an isolated, fully migrated database. The in-memory
//! variant is the default; the file-backed variant exists for tests
//! that reconnect or exercise the file-path handling.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tempfile::TempDir;

use vigil_interfaces::SystemRoleSeed;

use crate::config::StorageConfig;
use crate::connection::{DatabaseConnection, StorageError};
use crate::entities::{organizations, users};
use crate::repositories::SeaOrmRepositoryFactory;

/// Isolated test database with migrations applied
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Create a new in-memory test database
    pub async fn new() -> Result<Self, StorageError> {
        let connection = DatabaseConnection::new(StorageConfig::in_memory()).await?;
        connection.migrate().await?;

        Ok(Self {
            connection,
            _temp_dir: None,
        })
    }

    /// Create a file-backed test database in a temporary directory
    pub async fn new_file_backed() -> Result<Self, StorageError> {
        let temp_dir = TempDir::new()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create temp dir: {}", e)))?;
        let db_path = temp_dir.path().join("vigil-test.db");

        let config = StorageConfig {
            url: format!("sqlite://{}?mode=rwc", db_path.display()),
            max_connections: 5,
            min_connections: 1,
            connection_timeout: std::time::Duration::from_secs(5),
            idle_timeout: std::time::Duration::from_secs(60),
        };

        let connection = DatabaseConnection::new(config).await?;
        connection.migrate().await?;

        Ok(Self {
            connection,
            _temp_dir: Some(temp_dir),
        })
    }

    /// Build a repository factory over this database
    pub fn factory(&self) -> SeaOrmRepositoryFactory {
        SeaOrmRepositoryFactory::new(self.connection.clone())
    }

    /// Insert a bare organization row, returning its id
    pub async fn seed_organization(&self, name: &str) -> i32 {
        let now = Utc::now();
        let organization = organizations::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.connection.get_connection())
        .await
        .expect("failed to seed organization");

        organization.id
    }

    /// Insert a bare user row, returning its id
    pub async fn seed_user(&self, organization_id: i32, email: &str) -> i32 {
        let now = Utc::now();
        let user = users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set("$2b$12$seedseedseedseedseedse".to_string()),
            organization_id: Set(organization_id),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.connection.get_connection())
        .await
        .expect("failed to seed user");

        user.id
    }
}

/// The three role seeds every new organization is provisioned with.
///
/// Mirrors the production catalog: Admin holds the whole catalog,
/// Operator can observe and act on runtime resources, Viewer is
/// read-only.
pub fn system_role_seeds() -> Vec<SystemRoleSeed> {
    let reads = [
        "containers:read",
        "alerts:read",
        "logs:read",
        "metrics:read",
        "incidents:read",
    ];
    let operator = [
        "containers:read",
        "containers:operate",
        "alerts:read",
        "alerts:operate",
        "logs:read",
        "metrics:read",
        "incidents:read",
        "incidents:operate",
    ];
    let admin = [
        "containers:read",
        "containers:operate",
        "alerts:read",
        "alerts:operate",
        "logs:read",
        "metrics:read",
        "incidents:read",
        "incidents:operate",
        "users:read",
        "users:manage",
        "roles:read",
        "roles:manage",
        "api-keys:read",
        "api-keys:manage",
        "organization:manage",
    ];

    vec![
        SystemRoleSeed {
            name: "Admin".to_string(),
            description: "Full access to the organization".to_string(),
            permission_names: admin.iter().map(|s| s.to_string()).collect(),
            assign_to_owner: true,
        },
        SystemRoleSeed {
            name: "Operator".to_string(),
            description: "Operate runtime resources and incidents".to_string(),
            permission_names: operator.iter().map(|s| s.to_string()).collect(),
            assign_to_owner: false,
        },
        SystemRoleSeed {
            name: "Viewer".to_string(),
            description: "Read-only access".to_string(),
            permission_names: reads.iter().map(|s| s.to_string()).collect(),
            assign_to_owner: false,
        },
    ]
}
