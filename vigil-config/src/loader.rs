//! Configuration loading and environment variable handling

use crate::domains::VigilConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "VIGIL".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<VigilConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: VigilConfig = serde_yaml::from_str(&content)?;

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<VigilConfig> {
        let mut config = VigilConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<VigilConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut VigilConfig) -> ConfigResult<()> {
        self.apply_server_overrides(&mut config.server)?;
        self.apply_database_overrides(&mut config.database)?;
        self.apply_auth_overrides(&mut config.auth)?;
        self.apply_rate_limit_overrides(&mut config.rate_limit)?;
        self.apply_logging_overrides(&mut config.logging)?;

        Ok(())
    }

    /// Apply server config overrides
    fn apply_server_overrides(&self, config: &mut crate::domains::server::ServerConfig) -> ConfigResult<()> {
        if let Ok(bind) = self.get_env_var("SERVER_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        if let Ok(port) = self.get_env_var("SERVER_PORT") {
            config.port = port
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid SERVER_PORT: {}", e)))?;
        }

        Ok(())
    }

    /// Apply database config overrides
    fn apply_database_overrides(&self, config: &mut crate::domains::database::DatabaseConfig) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("DATABASE_URL") {
            config.url = url;
        }

        if let Ok(max) = self.get_env_var("DATABASE_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;
        }

        Ok(())
    }

    /// Apply auth config overrides
    fn apply_auth_overrides(&self, config: &mut crate::domains::auth::AuthConfig) -> ConfigResult<()> {
        if let Ok(secret) = self.get_env_var("AUTH_SIGNING_SECRET") {
            config.signing_secret = secret;
        }

        if let Ok(lifetime) = self.get_env_var("AUTH_ACCESS_TOKEN_LIFETIME") {
            let seconds: u64 = lifetime
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid AUTH_ACCESS_TOKEN_LIFETIME: {}", e)))?;
            config.access_token_lifetime = std::time::Duration::from_secs(seconds);
        }

        if let Ok(lifetime) = self.get_env_var("AUTH_REFRESH_TOKEN_LIFETIME") {
            let seconds: u64 = lifetime
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid AUTH_REFRESH_TOKEN_LIFETIME: {}", e)))?;
            config.refresh_token_lifetime = std::time::Duration::from_secs(seconds);
        }

        if let Ok(threshold) = self.get_env_var("AUTH_LOCKOUT_THRESHOLD") {
            config.lockout_threshold = threshold
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid AUTH_LOCKOUT_THRESHOLD: {}", e)))?;
        }

        if let Ok(duration) = self.get_env_var("AUTH_LOCKOUT_DURATION") {
            let seconds: u64 = duration
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid AUTH_LOCKOUT_DURATION: {}", e)))?;
            config.lockout_duration = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply rate limit config overrides
    fn apply_rate_limit_overrides(&self, config: &mut crate::domains::rate_limit::RateLimitConfig) -> ConfigResult<()> {
        if let Ok(enabled) = self.get_env_var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid RATE_LIMIT_ENABLED: {}", e)))?;
        }

        if let Ok(max) = self.get_env_var("RATE_LIMIT_MAX_REQUESTS") {
            config.max_requests = max
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid RATE_LIMIT_MAX_REQUESTS: {}", e)))?;
        }

        if let Ok(window) = self.get_env_var("RATE_LIMIT_WINDOW") {
            let seconds: u64 = window
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid RATE_LIMIT_WINDOW: {}", e)))?;
            config.window = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut crate::domains::logging::LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            use std::str::FromStr;
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            use std::str::FromStr;
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Each test uses its own env prefix so parallel tests never collide.

    #[test]
    fn test_from_file_applies_env_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "auth:\n  signing_secret: \"{}\"\nserver:\n  port: 9000\n",
            "s".repeat(32)
        )
        .unwrap();

        std::env::set_var("VIGIL_T1_SERVER_PORT", "9100");
        let config = ConfigLoader::with_prefix("VIGIL_T1").from_file(file.path()).unwrap();
        std::env::remove_var("VIGIL_T1_SERVER_PORT");

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.auth.signing_secret.len(), 32);
    }

    #[test]
    fn test_from_env_requires_signing_secret() {
        let result = ConfigLoader::with_prefix("VIGIL_T2").from_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_env_with_secret_succeeds() {
        std::env::set_var("VIGIL_T3_AUTH_SIGNING_SECRET", "x".repeat(40));
        std::env::set_var("VIGIL_T3_AUTH_LOCKOUT_THRESHOLD", "3");
        let config = ConfigLoader::with_prefix("VIGIL_T3").from_env().unwrap();
        std::env::remove_var("VIGIL_T3_AUTH_SIGNING_SECRET");
        std::env::remove_var("VIGIL_T3_AUTH_LOCKOUT_THRESHOLD");

        assert_eq!(config.auth.lockout_threshold, 3);
    }

    #[test]
    fn test_invalid_port_override_is_an_error() {
        std::env::set_var("VIGIL_T4_SERVER_PORT", "not-a-port");
        std::env::set_var("VIGIL_T4_AUTH_SIGNING_SECRET", "x".repeat(40));
        let result = ConfigLoader::with_prefix("VIGIL_T4").from_env();
        std::env::remove_var("VIGIL_T4_SERVER_PORT");
        std::env::remove_var("VIGIL_T4_AUTH_SIGNING_SECRET");

        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    }
}
