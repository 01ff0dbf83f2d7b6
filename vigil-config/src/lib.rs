//! Domain-driven configuration management for Vigil
//!
//! This crate provides modular configuration split by functional domains,
//! with validation, defaults, and environment variable support. Validation
//! runs once at startup and the process refuses to come up on any failure;
//! the one hard requirement is a signing secret of at least 32 characters.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    auth::AuthConfig,
    database::DatabaseConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    rate_limit::RateLimitConfig,
    server::{CorsConfig, ServerConfig},
    VigilConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
pub use validation::Validatable;
