//! Authentication and authorization guards
//!
//! `require_auth` turns a Bearer access token into an [`AuthContext`]
//! request extension. The permission, role and organization guards then
//! check that context; they assume `require_auth` ran earlier in the stack
//! and treat a missing context as an unauthenticated request.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, RawPathParams, Request};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use vigil_auth::JwtManager;
use vigil_rbac::{AuthContext, PermissionSet};

use super::GuardFuture;
use crate::errors::WebError;

/// Extract the token from a `Bearer` Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Client address as reported by the transport, when connect info is wired
pub(crate) fn client_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Validate the Bearer access token and attach an [`AuthContext`].
///
/// Missing or malformed credentials are 401. An expired token reports
/// `TOKEN_EXPIRED` so clients know to refresh instead of re-login; every
/// other validation failure reports `TOKEN_INVALID`.
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let tokens = request
        .extensions()
        .get::<Arc<JwtManager>>()
        .ok_or_else(|| WebError::internal("Token manager not wired into the router"))?;

    let token = bearer_token(&headers).ok_or(WebError::AuthenticationRequired)?;
    let claims = tokens.validate_access_token(token)?;

    let mut context = AuthContext::new(claims.user_id, claims.email, claims.organization_id)
        .with_roles(claims.roles)
        .with_permissions(PermissionSet::from_names(claims.permissions));
    if let Some(ip) = client_ip(&request) {
        context = context.with_client_ip(ip);
    }

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Require every named permission on the attached [`AuthContext`]
pub fn require_permissions(
    required: &'static [&'static str],
) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let context = authenticated_context(&request)?;
            if !context.has_all_permissions(required) {
                debug!(user_id = context.user_id, ?required, "permission denied");
                return Err(insufficient_permissions(required, context));
            }
            Ok(next.run(request).await)
        })
    }
}

/// Require at least one of the named permissions
pub fn require_any_permission(
    required: &'static [&'static str],
) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let context = authenticated_context(&request)?;
            if !context.has_any_permission(required) {
                debug!(user_id = context.user_id, ?required, "permission denied");
                return Err(insufficient_permissions(required, context));
            }
            Ok(next.run(request).await)
        })
    }
}

/// Require an exact role name on the attached [`AuthContext`]
pub fn require_role(role: &'static str) -> impl Fn(Request, Next) -> GuardFuture + Clone {
    move |request: Request, next: Next| {
        Box::pin(async move {
            let context = authenticated_context(&request)?;
            if !context.has_role(role) {
                debug!(user_id = context.user_id, role, "role denied");
                return Err(WebError::InsufficientPermissions {
                    required: vec![format!("role:{role}")],
                    current: context.roles.clone(),
                });
            }
            Ok(next.run(request).await)
        })
    }
}

/// Enforce that a path `org_id` names the caller's own organization.
///
/// Routes without an `org_id` parameter pass through untouched.
pub async fn require_organization(
    params: RawPathParams,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let Some(target) = params
        .iter()
        .find(|(name, _)| *name == "org_id")
        .map(|(_, value)| value.to_string())
    else {
        return Ok(next.run(request).await);
    };

    let context = authenticated_context(&request)?;
    let target: i32 = target
        .parse()
        .map_err(|_| WebError::validation("Organization id must be numeric"))?;
    if target != context.organization_id {
        debug!(
            user_id = context.user_id,
            organization_id = context.organization_id,
            target,
            "cross-tenant access denied"
        );
        return Err(WebError::CrossTenantAccessDenied {
            message: "Access to another organization's resources is not allowed".to_string(),
        });
    }

    Ok(next.run(request).await)
}

fn authenticated_context(request: &Request) -> Result<&AuthContext, WebError> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or(WebError::AuthenticationRequired)
}

fn insufficient_permissions(required: &[&str], context: &AuthContext) -> WebError {
    WebError::InsufficientPermissions {
        required: required.iter().map(|p| p.to_string()).collect(),
        current: context.permissions.iter().map(str::to_string).collect(),
    }
}
