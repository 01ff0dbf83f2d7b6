//! Role, permission and assignment endpoints
//!
//! Every operation runs against the calling user's organization. The
//! organization is taken from the authenticated context, never from the
//! request body, so a caller cannot write into another tenant.

use axum::{
    extract::{Extension, Path, Query, State},
    response::IntoResponse,
    Json,
};
use tracing::info;
use vigil_api_types::PaginationInput;
use vigil_rbac::AuthContext;
use vigil_web::{created, no_content, ok, ApiResponse};

use crate::{
    context::AppContext,
    errors::RestResult,
    models::{CreateRoleRequest, UpdateRoleRequest},
};

/// List the full permission catalog
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "roles",
    operation_id = "listPermissions",
    responses(
        (status = 200, description = "Permission catalog"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_permissions(State(ctx): State<AppContext>) -> RestResult<impl IntoResponse> {
    let permissions = ctx.repositories.permission_repository().list_all().await?;
    Ok(ok(permissions))
}

/// List roles in the calling user's organization
#[utoipa::path(
    get,
    path = "/roles",
    tag = "roles",
    operation_id = "listRoles",
    params(
        ("page" = Option<u32>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u32>, Query, description = "Number of items per page (max 500)"),
        ("offset" = Option<u32>, Query, description = "Raw offset, takes precedence over page")
    ),
    responses(
        (status = 200, description = "Roles visible to the caller"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing roles:read permission"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_roles(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<PaginationInput>,
) -> RestResult<impl IntoResponse> {
    let roles = ctx.roles.list_roles(&auth, pagination).await?;
    Ok(ApiResponse::from(roles))
}

/// Fetch one role by ID
#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "roles",
    operation_id = "getRole",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Role details"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing roles:read permission"),
        (status = 404, description = "Role not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(role_id): Path<i32>,
) -> RestResult<impl IntoResponse> {
    let role = ctx.roles.get_role(&auth, role_id).await?;
    Ok(ok(role))
}

/// Create a custom role
#[utoipa::path(
    post,
    path = "/roles",
    tag = "roles",
    operation_id = "createRole",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created"),
        (status = 400, description = "Invalid name, description or permission IDs"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing roles:manage permission"),
        (status = 409, description = "Role name already taken in this organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateRoleRequest>,
) -> RestResult<impl IntoResponse> {
    let role = ctx.roles.create_role(&auth, request.into()).await?;

    info!(
        "Role created: {} (ID: {}) in organization {}",
        role.name, role.id, auth.organization_id
    );
    Ok(created(role))
}

/// Update a custom role
#[utoipa::path(
    patch,
    path = "/roles/{id}",
    tag = "roles",
    operation_id = "updateRole",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated"),
        (status = 400, description = "Invalid name, description or permission IDs, or role is a system role"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing roles:manage permission"),
        (status = 404, description = "Role not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(role_id): Path<i32>,
    Json(request): Json<UpdateRoleRequest>,
) -> RestResult<impl IntoResponse> {
    let role = ctx.roles.update_role(&auth, role_id, request.into()).await?;
    Ok(ok(role))
}

/// Delete a custom role
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "roles",
    operation_id = "deleteRole",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 400, description = "Role still has assigned users, or role is a system role"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing roles:manage permission"),
        (status = 404, description = "Role not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(role_id): Path<i32>,
) -> RestResult<impl IntoResponse> {
    ctx.roles.delete_role(&auth, role_id).await?;
    Ok(no_content())
}

/// Assign a role to a user in the caller's organization
#[utoipa::path(
    post,
    path = "/users/{id}/roles/{role_id}",
    tag = "roles",
    operation_id = "assignRole",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("role_id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Assignment recorded; `assigned` is false when it already existed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing users:manage permission"),
        (status = 404, description = "User or role not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn assign_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, role_id)): Path<(i32, i32)>,
) -> RestResult<impl IntoResponse> {
    let assigned = ctx.roles.assign_role(&auth, user_id, role_id).await?;
    Ok(ok(serde_json::json!({
        "assigned": assigned,
    })))
}

/// Remove a role from a user in the caller's organization
#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role_id}",
    tag = "roles",
    operation_id = "removeRole",
    params(
        ("id" = i32, Path, description = "User ID"),
        ("role_id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Removal recorded; `removed` is false when no assignment existed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing users:manage permission"),
        (status = 404, description = "User or role not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn remove_role(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path((user_id, role_id)): Path<(i32, i32)>,
) -> RestResult<impl IntoResponse> {
    let removed = ctx.roles.remove_role(&auth, user_id, role_id).await?;
    Ok(ok(serde_json::json!({
        "removed": removed,
    })))
}

/// Resolved permission set of a user in the caller's organization
#[utoipa::path(
    get,
    path = "/users/{id}/permissions",
    tag = "roles",
    operation_id = "getUserPermissions",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Permissions the user holds through role assignments"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing users:read permission"),
        (status = 404, description = "User not found in the caller's organization"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn user_permissions(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<i32>,
) -> RestResult<impl IntoResponse> {
    let permissions = ctx.roles.user_permissions(&auth, user_id).await?;
    Ok(ok(serde_json::json!({
        "userId": user_id,
        "permissions": permissions,
    })))
}
