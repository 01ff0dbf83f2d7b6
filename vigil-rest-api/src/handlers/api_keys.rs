//! API key management endpoints
//!
//! Keys carry a permission snapshot frozen at issuance and are always scoped
//! to the calling user. Listing and revocation only ever see the caller's
//! own keys.

use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Json,
};
use tracing::info;
use vigil_rbac::AuthContext;
use vigil_web::{created, no_content, ok};

use crate::{
    context::AppContext,
    errors::RestResult,
    models::{CreateApiKeyRequest, IssuedApiKeyResponse},
};

/// List the calling user's API keys
#[utoipa::path(
    get,
    path = "/api-keys",
    tag = "api-keys",
    operation_id = "listApiKeys",
    responses(
        (status = 200, description = "API keys owned by the caller, secrets omitted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing api-keys:read permission"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_api_keys(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
) -> RestResult<impl IntoResponse> {
    let keys = ctx.api_keys.list(auth.user_id).await?;
    Ok(ok(keys))
}

/// Issue a new API key
///
/// The plaintext secret appears in this response and nowhere else.
#[utoipa::path(
    post,
    path = "/api-keys",
    tag = "api-keys",
    operation_id = "createApiKey",
    request_body = CreateApiKeyRequest,
    responses(
        (status = 201, description = "Key issued; the body carries the only copy of the secret"),
        (status = 400, description = "Invalid name, unknown permission names, or expiry in the past"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing api-keys:manage permission"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_api_key(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> RestResult<impl IntoResponse> {
    let issued = ctx
        .api_keys
        .issue(
            &request.name,
            auth.user_id,
            auth.organization_id,
            request.permissions,
            request.expires_at,
            auth.client_ip.as_deref(),
        )
        .await?;

    info!(
        "API key issued: {} (ID: {}) for user {}",
        issued.key.name, issued.key.id, auth.user_id
    );
    Ok(created(IssuedApiKeyResponse {
        api_key: issued.api_key,
        key: issued.key,
    }))
}

/// Revoke one of the calling user's API keys
#[utoipa::path(
    delete,
    path = "/api-keys/{id}",
    tag = "api-keys",
    operation_id = "revokeApiKey",
    params(
        ("id" = i32, Path, description = "API key ID")
    ),
    responses(
        (status = 204, description = "Key revoked"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing api-keys:manage permission"),
        (status = 404, description = "Key not found or not owned by the caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn revoke_api_key(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<i32>,
) -> RestResult<impl IntoResponse> {
    ctx.api_keys
        .revoke_owned(auth.user_id, key_id, auth.client_ip.as_deref())
        .await?;
    Ok(no_content())
}
