//! Authentication and session endpoints

use axum::{
    extract::{Extension, Path, State},
    response::IntoResponse,
    Json,
};
use tracing::info;
use vigil_rbac::AuthContext;
use vigil_web::{created, no_content, ok, ClientIp};

use crate::{
    context::AppContext,
    errors::RestResult,
    models::{
        ChangePasswordRequest, LoginRequest, PasswordResetConfirmRequest, PasswordResetRequest,
        RefreshRequest, RegisterRequest, SessionResponse, UserProfile,
    },
};

/// Register a new organization and its first user
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    operation_id = "register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Organization and user created, session issued"),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 429, description = "Too many registration attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register(
    State(ctx): State<AppContext>,
    ClientIp(ip): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> RestResult<impl IntoResponse> {
    info!("Registration attempt for email: {}", request.email);

    let session = ctx
        .credentials
        .register(
            &request.email,
            &request.password,
            &request.organization_name,
            ip.as_deref(),
        )
        .await?;

    info!(
        "Registration successful for email: {} (user ID: {})",
        request.email, session.user.user.id
    );
    Ok(created(SessionResponse::from_issued(
        session,
        ctx.tokens.access_token_ttl().num_seconds(),
    )))
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    operation_id = "login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Invalid credentials or account locked"),
        (status = 429, description = "Too many login attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login(
    State(ctx): State<AppContext>,
    ClientIp(ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> RestResult<impl IntoResponse> {
    info!("Login attempt for email: {}", request.email);

    let session = ctx
        .credentials
        .login(
            &request.email,
            &request.password,
            request.device_info,
            ip.as_deref(),
        )
        .await?;

    info!(
        "Login successful for email: {} (user ID: {})",
        request.email, session.user.user.id
    );
    Ok(ok(SessionResponse::from_issued(
        session,
        ctx.tokens.access_token_ttl().num_seconds(),
    )))
}

/// Redeem a refresh token for a new session
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    operation_id = "refreshSession",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New session issued"),
        (status = 401, description = "Refresh token invalid or expired"),
        (status = 429, description = "Too many refresh attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn refresh(
    State(ctx): State<AppContext>,
    Json(request): Json<RefreshRequest>,
) -> RestResult<impl IntoResponse> {
    let session = ctx
        .credentials
        .refresh(&request.refresh_token, request.device_info)
        .await?;

    info!(
        "Session refreshed for user ID: {}",
        session.user.user.id
    );
    Ok(ok(SessionResponse::from_issued(
        session,
        ctx.tokens.access_token_ttl().num_seconds(),
    )))
}

/// Revoke every refresh session for the calling user
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    operation_id = "logout",
    responses(
        (status = 200, description = "All sessions revoked"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn logout(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
) -> RestResult<impl IntoResponse> {
    let revoked = ctx
        .credentials
        .logout(auth.user_id, auth.client_ip.as_deref())
        .await?;

    Ok(ok(serde_json::json!({
        "message": "Logged out",
        "sessionsRevoked": revoked,
    })))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    operation_id = "getCurrentUser",
    responses(
        (status = 200, description = "Current user information"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn me(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
) -> RestResult<impl IntoResponse> {
    let user = ctx.credentials.authenticated_user(auth.user_id).await?;
    Ok(ok(UserProfile::from(user)))
}

/// List the calling user's active refresh sessions
#[utoipa::path(
    get,
    path = "/auth/sessions",
    tag = "auth",
    operation_id = "listSessions",
    responses(
        (status = 200, description = "Active sessions for the calling user"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
) -> RestResult<impl IntoResponse> {
    let sessions = ctx.credentials.list_sessions(auth.user_id).await?;
    Ok(ok(sessions))
}

/// Revoke one of the calling user's refresh sessions
#[utoipa::path(
    delete,
    path = "/auth/sessions/{id}",
    tag = "auth",
    operation_id = "revokeSession",
    params(
        ("id" = i32, Path, description = "Session ID")
    ),
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Session not found or not owned by the caller"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn revoke_session(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<i32>,
) -> RestResult<impl IntoResponse> {
    ctx.credentials
        .revoke_session(auth.user_id, session_id, auth.client_ip.as_deref())
        .await?;
    Ok(no_content())
}

/// Request a password reset token
///
/// The response is identical whether or not the email is registered. The
/// reset token itself is delivered out of band, never in the HTTP response.
#[utoipa::path(
    post,
    path = "/auth/password-reset/request",
    tag = "auth",
    operation_id = "requestPasswordReset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset requested"),
        (status = 429, description = "Too many reset requests"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn request_password_reset(
    State(ctx): State<AppContext>,
    ClientIp(ip): ClientIp,
    Json(request): Json<PasswordResetRequest>,
) -> RestResult<impl IntoResponse> {
    let _ = ctx
        .credentials
        .request_password_reset(&request.email, ip.as_deref())
        .await?;

    Ok(ok(serde_json::json!({
        "message": "If that email is registered, a reset token has been issued",
    })))
}

/// Redeem a password reset token
#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    tag = "auth",
    operation_id = "confirmPasswordReset",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "New password rejected by policy"),
        (status = 401, description = "Reset token invalid or expired"),
        (status = 429, description = "Too many reset attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reset_password(
    State(ctx): State<AppContext>,
    ClientIp(ip): ClientIp,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> RestResult<impl IntoResponse> {
    ctx.credentials
        .reset_password(&request.reset_token, &request.new_password, ip.as_deref())
        .await?;

    Ok(ok(serde_json::json!({
        "message": "Password has been reset",
    })))
}

/// Change the calling user's password
#[utoipa::path(
    post,
    path = "/auth/password",
    tag = "auth",
    operation_id = "changePassword",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "New password rejected by policy"),
        (status = 401, description = "Current password incorrect"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn change_password(
    State(ctx): State<AppContext>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> RestResult<impl IntoResponse> {
    ctx.credentials
        .change_password(
            auth.user_id,
            &request.current_password,
            &request.new_password,
            auth.client_ip.as_deref(),
        )
        .await?;

    info!("Password changed for user ID: {}", auth.user_id);
    Ok(ok(serde_json::json!({
        "message": "Password changed",
    })))
}
