//! CORS layer construction

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// CORS settings for the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins; `["*"]` allows any origin
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed request headers
    pub allowed_headers: Vec<String>,
    /// Preflight cache lifetime
    pub max_age: Duration,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "content-type".to_string(),
                "authorization".to_string(),
                "x-api-key".to_string(),
                "x-request-id".to_string(),
            ],
            max_age: Duration::from_secs(3600),
        }
    }
}

/// Build a [`CorsLayer`] from settings.
///
/// Entries that fail to parse as header values, header names or methods are
/// skipped with a warning rather than failing router construction.
pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if settings.allowed_origins.iter().any(|origin| origin == "*") {
        warn!("CORS allows any origin");
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = settings
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin, "skipping unparseable CORS origin");
                    None
                }
            })
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = settings
        .allowed_methods
        .iter()
        .filter_map(|method| method.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = settings
        .allowed_headers
        .iter()
        .filter_map(|header| header.parse().ok())
        .collect();

    cors.allow_methods(methods)
        .allow_headers(headers)
        .max_age(settings.max_age)
}
