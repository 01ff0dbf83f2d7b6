//! Server startup and shutdown logic

use anyhow::{Context, Result};
use axum::{routing::get, Router};

use vigil_config::VigilConfig;
use vigil_rest_api::{create_app, AppConfig, RateBudgets};
use vigil_web::CorsSettings;

use crate::services::{chrono_duration, ServiceContainer};

/// Server application struct
pub struct Server {
    config: VigilConfig,
    services: ServiceContainer,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: VigilConfig) -> Result<Self> {
        // Initialize logging first
        crate::services::init_logging(&config)?;

        // Create service container
        let services = ServiceContainer::new(&config).await?;

        Ok(Self { config, services })
    }

    /// Build the complete application router
    pub fn build_app(&self) -> Result<Router> {
        let app = create_app(self.services.rest_context(), rest_config(&self.config)?);

        Ok(app.route("/", get(root_handler)))
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let app = self.build_app()?;
        let addr = self.config.server.socket_addr();

        self.log_config_summary();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        tracing::info!("Server listening on {}", addr);

        // Connect info feeds the client address into audit events.
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Log configuration summary
    fn log_config_summary(&self) {
        tracing::info!("=== Vigil Server Configuration ===");
        tracing::info!("Bind Address: {}", self.config.server.socket_addr());
        tracing::info!("Database: {}", self.config.database.url);
        tracing::info!(
            "Auto Migrate: {}",
            if self.config.database.auto_migrate {
                "Enabled"
            } else {
                "Disabled"
            }
        );
        tracing::info!(
            "Rate Limiting: {}",
            if self.config.rate_limit.enabled {
                "Enabled"
            } else {
                "Disabled"
            }
        );
        tracing::info!(
            "Access Token Lifetime: {}s",
            self.config.auth.access_token_lifetime.as_secs()
        );
        tracing::info!("Token Issuer: {}", self.config.auth.issuer);
        tracing::info!("==================================");
    }
}

/// Map the loaded configuration onto the REST application config
fn rest_config(config: &VigilConfig) -> Result<AppConfig> {
    let rate_limits = if config.rate_limit.enabled {
        Some(RateBudgets {
            max_requests: config.rate_limit.max_requests,
            window: chrono_duration(config.rate_limit.window, "rate_limit.window")?,
            auth_max_requests: config.rate_limit.auth_max_requests,
            auth_window: chrono_duration(config.rate_limit.auth_window, "rate_limit.auth_window")?,
        })
    } else {
        None
    };

    Ok(AppConfig {
        cors: Some(CorsSettings {
            allowed_origins: config.server.cors.allowed_origins.clone(),
            allowed_methods: config.server.cors.allowed_methods.clone(),
            allowed_headers: config.server.cors.allowed_headers.clone(),
            max_age: config.server.cors.max_age,
        }),
        request_timeout: Some(config.server.request_timeout),
        rate_limits,
        ..AppConfig::default()
    })
}

/// Root handler
async fn root_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "service": "Vigil Authentication & RBAC Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "rest_api": "/api/v1",
            "health": "/health"
        }
    }))
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
