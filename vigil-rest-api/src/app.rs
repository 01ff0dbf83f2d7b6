//! Application configuration and router assembly
//!
//! Routes are grouped by guard chain and merged into one router, so each
//! group states its full requirements in one place. `require_auth` wraps the
//! whole protected group; permission guards and the tenancy guard sit inside
//! it, per group.

use axum::{
    middleware::from_fn,
    routing::{delete, get, patch, post},
    Extension, Router,
};
use chrono::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use vigil_web::{
    cors_layer, rate_limit, request_id_middleware, require_auth, require_organization,
    require_permissions, CorsSettings,
};

use crate::{context::AppContext, handlers};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API path prefix
    pub api_prefix: String,
    /// CORS settings; `None` leaves the layer off
    pub cors: Option<CorsSettings>,
    /// Request id propagation
    pub enable_request_id: bool,
    /// Request tracing
    pub enable_tracing: bool,
    /// Whole-request timeout; `None` leaves the layer off
    pub request_timeout: Option<std::time::Duration>,
    /// Fixed-window budgets; `None` disables rate limiting
    pub rate_limits: Option<RateBudgets>,
}

/// Budgets for the two rate-limited route groups
#[derive(Debug, Clone, Copy)]
pub struct RateBudgets {
    /// Per-user budget over the authenticated API
    pub max_requests: u32,
    /// Window the per-user budget applies over
    pub window: Duration,
    /// Stricter per-IP budget over credential endpoints
    pub auth_max_requests: u32,
    /// Window the credential budget applies over
    pub auth_window: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/v1".to_string(),
            cors: Some(CorsSettings::default()),
            enable_request_id: true,
            enable_tracing: true,
            request_timeout: Some(std::time::Duration::from_secs(30)),
            rate_limits: Some(RateBudgets::default()),
        }
    }
}

impl Default for RateBudgets {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::seconds(60),
            auth_max_requests: 10,
            auth_window: Duration::seconds(60),
        }
    }
}

/// Create the complete REST application
pub fn create_app(context: AppContext, config: AppConfig) -> Router {
    let tokens = context.tokens.clone();
    let api_keys = context.api_keys.clone();
    let rate_limiter = context.rate_limiter.clone();

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest(&config.api_prefix, api_router(&config))
        .with_state(context)
        // Guards look these up in request extensions.
        .layer(Extension(tokens))
        .layer(Extension(api_keys))
        .layer(Extension(rate_limiter));

    if let Some(cors) = &config.cors {
        app = app.layer(cors_layer(cors));
    }

    if let Some(timeout) = config.request_timeout {
        app = app.layer(TimeoutLayer::new(timeout));
    }

    if config.enable_request_id {
        app = app.layer(from_fn(request_id_middleware));
    }

    if config.enable_tracing {
        app = app.layer(TraceLayer::new_for_http());
    }

    app
}

/// Assemble the API surface from its guard groups
fn api_router(config: &AppConfig) -> Router<AppContext> {
    // Credential endpoints reachable without a token, budgeted per client IP.
    let mut public = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route(
            "/auth/password-reset/request",
            post(handlers::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::reset_password),
        );
    if let Some(budgets) = config.rate_limits {
        public = public.layer(from_fn(rate_limit(
            budgets.auth_max_requests,
            budgets.auth_window,
        )));
    }

    // Session and profile endpoints, open to any authenticated user.
    let authed = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/password", post(handlers::change_password))
        .route("/auth/me", get(handlers::me))
        .route("/auth/sessions", get(handlers::list_sessions))
        .route("/auth/sessions/{id}", delete(handlers::revoke_session))
        .route("/permissions", get(handlers::list_permissions));

    let roles_read = Router::new()
        .route("/roles", get(handlers::list_roles))
        .route("/roles/{id}", get(handlers::get_role))
        .layer(from_fn(require_permissions(&["roles:read"])));

    let roles_manage = Router::new()
        .route("/roles", post(handlers::create_role))
        .route(
            "/roles/{id}",
            patch(handlers::update_role).delete(handlers::delete_role),
        )
        .layer(from_fn(require_permissions(&["roles:manage"])));

    let users_read = Router::new()
        .route("/users/{id}/permissions", get(handlers::user_permissions))
        .layer(from_fn(require_permissions(&["users:read"])));

    let users_manage = Router::new()
        .route(
            "/users/{id}/roles/{role_id}",
            post(handlers::assign_role).delete(handlers::remove_role),
        )
        .layer(from_fn(require_permissions(&["users:manage"])));

    let keys_read = Router::new()
        .route("/api-keys", get(handlers::list_api_keys))
        .layer(from_fn(require_permissions(&["api-keys:read"])));

    let keys_manage = Router::new()
        .route("/api-keys", post(handlers::create_api_key))
        .route("/api-keys/{id}", delete(handlers::revoke_api_key))
        .layer(from_fn(require_permissions(&["api-keys:manage"])));

    // The path names a tenant; it must be the caller's own.
    let org_scoped = Router::new()
        .route("/orgs/{org_id}/roles", get(handlers::list_roles))
        .layer(from_fn(require_permissions(&["roles:read"])))
        .layer(from_fn(require_organization));

    let mut protected = authed
        .merge(roles_read)
        .merge(roles_manage)
        .merge(users_read)
        .merge(users_manage)
        .merge(keys_read)
        .merge(keys_manage)
        .merge(org_scoped);
    if let Some(budgets) = config.rate_limits {
        // Inside require_auth, so the limiter keys on the authenticated user.
        protected = protected.layer(from_fn(rate_limit(budgets.max_requests, budgets.window)));
    }
    let protected = protected.layer(from_fn(require_auth));

    public.merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tower::ServiceExt;

    use vigil_api_types::{ListResponse, UnifiedRole};
    use vigil_auth::{JwtManager, TokenConfig};
    use vigil_interfaces::testing::TestFactory;
    use vigil_interfaces::RateWindow;
    use vigil_web::TracingAuditSink;

    const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn token_manager() -> Arc<JwtManager> {
        Arc::new(JwtManager::new(TokenConfig::new(TEST_SECRET)))
    }

    fn context_with(factory: TestFactory, tokens: Arc<JwtManager>) -> AppContext {
        AppContext::new(
            Arc::new(factory),
            Arc::new(TracingAuditSink::default()),
            tokens,
        )
    }

    /// Config without rate limiting, so guard tests need no limiter mocks
    fn quiet_config() -> AppConfig {
        AppConfig {
            rate_limits: None,
            ..AppConfig::default()
        }
    }

    fn bearer_for(tokens: &JwtManager) -> String {
        let token = tokens
            .generate_access_token(
                7,
                "ops@acme.example",
                3,
                vec!["Operator".to_string()],
                vec!["roles:read".to_string()],
            )
            .unwrap();
        format!("Bearer {token}")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_database_check() {
        let app = create_app(
            context_with(TestFactory::default(), token_manager()),
            quiet_config(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"]["database"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let app = create_app(
            context_with(TestFactory::default(), token_manager()),
            quiet_config(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/roles")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_cross_tenant_listing_is_rejected() {
        let tokens = token_manager();
        let bearer = bearer_for(&tokens);
        let app = create_app(context_with(TestFactory::default(), tokens), quiet_config());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orgs/4/roles")
                    .header("authorization", &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "CROSS_TENANT_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn test_own_organization_listing_reaches_the_handler() {
        let mut factory = TestFactory::default();
        factory
            .roles
            .expect_list_for_organization()
            .withf(|organization_id, _| *organization_id == 3)
            .returning(|_, _| Ok(ListResponse::from_vec(Vec::<UnifiedRole>::new())));

        let tokens = token_manager();
        let bearer = bearer_for(&tokens);
        let app = create_app(context_with(factory, tokens), quiet_config());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orgs/3/roles")
                    .header("authorization", &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_credential_endpoints_enforce_their_budget() {
        let mut factory = TestFactory::default();
        factory.rate_limits.expect_fetch().returning(|_| {
            Ok(Some(RateWindow {
                requests: 10,
                window_start: Utc::now(),
            }))
        });

        let app = create_app(
            context_with(factory, token_manager()),
            AppConfig::default(),
        );

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"email":"ops@acme.example","password":"hunter2hunter2"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "RATE_LIMIT_EXCEEDED");
    }
}
