//! # Vigil Web Utilities
//!
//! Shared HTTP plumbing for Vigil services:
//!
//! - **Guards**: [`middleware::require_auth`], [`middleware::require_permissions`],
//!   [`middleware::require_any_permission`], [`middleware::require_role`],
//!   [`middleware::require_api_key`], [`middleware::require_organization`] and
//!   [`middleware::rate_limit`]
//! - **Errors**: the [`WebError`] taxonomy with its stable code and status mapping
//! - **Responses**: the [`ApiResponse`] envelope and helpers
//! - **Observability**: request id propagation and the tracing audit sink
//!
//! Guards find their services in request extensions; routers wire each
//! service once with an `Extension` layer and stack guards per route.

pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use errors::{WebError, WebResult};
pub use extractors::ClientIp;
pub use middleware::{
    cors_layer, rate_limit, request_id_middleware, require_any_permission, require_api_key,
    require_auth, require_organization, require_permissions, require_role, CorsSettings, RequestId,
    TracingAuditSink, API_KEY_HEADER, REQUEST_ID_HEADER,
};
pub use response::{created, no_content, ok, ApiResponse, ResponseMeta};
