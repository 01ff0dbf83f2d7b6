//! Service construction and dependency injection setup

use std::sync::Arc;

use anyhow::{Context, Result};

use vigil_auth::{CredentialPolicy, CredentialService, JwtManager, TokenConfig};
use vigil_config::{AuthConfig, LogFormat, VigilConfig};
use vigil_interfaces::{AuditSink, RepositoryFactory};
use vigil_rest_api::AppContext;
use vigil_storage::{DatabaseConnection, SeaOrmRepositoryFactory, StorageConfig};
use vigil_web::TracingAuditSink;

/// Service container holding all wired application services
#[derive(Clone)]
pub struct ServiceContainer {
    pub repositories: Arc<dyn RepositoryFactory>,
    pub tokens: Arc<JwtManager>,
    context: AppContext,
}

impl ServiceContainer {
    /// Connect to storage and assemble the full service stack
    pub async fn new(config: &VigilConfig) -> Result<Self> {
        let db = DatabaseConnection::new(storage_config(config))
            .await
            .context("failed to connect to the database")?;

        if config.database.auto_migrate {
            db.migrate().await.context("database migration failed")?;
            tracing::info!("Database migrations applied");
        }

        let repositories: Arc<dyn RepositoryFactory> = Arc::new(SeaOrmRepositoryFactory::new(db));
        let tokens = Arc::new(JwtManager::new(token_config(&config.auth)?));
        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);

        // The default credential policy is replaced with the configured one.
        let context = AppContext::new(repositories.clone(), audit.clone(), tokens.clone())
            .with_credentials(CredentialService::new(
                repositories.clone(),
                audit,
                tokens.clone(),
                credential_policy(&config.auth)?,
            ));

        Ok(Self {
            repositories,
            tokens,
            context,
        })
    }

    /// REST application context backed by this container's services
    pub fn rest_context(&self) -> AppContext {
        self.context.clone()
    }
}

fn storage_config(config: &VigilConfig) -> StorageConfig {
    StorageConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        connection_timeout: config.database.connection_timeout,
        idle_timeout: config.database.idle_timeout,
    }
}

fn token_config(auth: &AuthConfig) -> Result<TokenConfig> {
    Ok(TokenConfig {
        signing_secret: auth.signing_secret.clone(),
        issuer: auth.issuer.clone(),
        audience: auth.audience.clone(),
        access_token_ttl: chrono_duration(auth.access_token_lifetime, "auth.access_token_lifetime")?,
    })
}

fn credential_policy(auth: &AuthConfig) -> Result<CredentialPolicy> {
    Ok(CredentialPolicy {
        lockout_threshold: auth.lockout_threshold,
        lockout_duration: chrono_duration(auth.lockout_duration, "auth.lockout_duration")?,
        refresh_token_ttl: chrono_duration(auth.refresh_token_lifetime, "auth.refresh_token_lifetime")?,
        reset_token_ttl: chrono_duration(auth.reset_token_lifetime, "auth.reset_token_lifetime")?,
    })
}

/// Convert a configured `std::time::Duration` into the chrono form the
/// services use, naming the offending field on overflow.
pub(crate) fn chrono_duration(value: std::time::Duration, field: &str) -> Result<chrono::Duration> {
    chrono::Duration::from_std(value)
        .map_err(|_| anyhow::anyhow!("configured duration for {} is out of range", field))
}

/// Initialize the logging system from the loaded configuration
pub fn init_logging(config: &VigilConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_filter_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let location = config.logging.include_location;

    let result = match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_file(location)
                    .with_line_number(location),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(location)
                    .with_line_number(location),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_file(location)
                    .with_line_number(location),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_file(location)
                    .with_line_number(location),
            )
            .try_init(),
    };

    // Use try_init to avoid panic if global subscriber already set
    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}
