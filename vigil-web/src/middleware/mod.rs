//! Tower middleware for Vigil HTTP services
//!
//! Guards read the services they need (`JwtManager`, `ApiKeyService`,
//! `RateLimiter`) from request extensions, so routers wire them once with
//! `Extension` layers and compose guards per route.

pub mod api_key;
pub mod audit;
pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod request_id;

use std::future::Future;
use std::pin::Pin;

use axum::response::Response;

use crate::errors::WebError;

/// Future returned by the guard factories, shaped for `middleware::from_fn`
pub type GuardFuture = Pin<Box<dyn Future<Output = Result<Response, WebError>> + Send>>;

pub use api_key::{require_api_key, API_KEY_HEADER};
pub use audit::TracingAuditSink;
pub use auth::{
    require_any_permission, require_auth, require_organization, require_permissions, require_role,
};
pub use cors::{cors_layer, CorsSettings};
pub use rate_limit::{
    rate_limit, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
};
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
