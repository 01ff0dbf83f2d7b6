//! API key guard
//!
//! Programmatic callers present an `X-API-Key` header instead of a Bearer
//! token. A validated key attaches an [`ApiKeyIdentity`] extension, a
//! deliberately different type from the interactive [`AuthContext`] so
//! handlers cannot confuse the two credential kinds.
//!
//! [`AuthContext`]: vigil_rbac::AuthContext

use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use vigil_auth::{ApiKeyIdentity, ApiKeyService};

use crate::errors::WebError;

/// Header carrying the plaintext API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Validate the `X-API-Key` header and attach an [`ApiKeyIdentity`].
///
/// A missing header is 401; unknown and expired keys fail with their own
/// codes so callers can tell a revoked key from an expired one.
pub async fn require_api_key(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let service = request
        .extensions()
        .get::<Arc<ApiKeyService>>()
        .cloned()
        .ok_or_else(|| WebError::internal("API key service not wired into the router"))?;

    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebError::AuthenticationRequired)?;

    let identity = service.validate(presented).await?;
    debug!(key_id = identity.key_id, user_id = identity.user_id, "api key accepted");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
