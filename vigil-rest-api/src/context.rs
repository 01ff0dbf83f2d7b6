//! Dependency container for REST handlers
//!
//! Handlers receive one [`AppContext`] through axum state. The guard
//! middlewares read their services from request extensions instead, so the
//! router wires `tokens`, `api_keys` and `rate_limiter` a second time as
//! `Extension` layers; both views share the same `Arc`s.

use std::sync::Arc;

use vigil_auth::{ApiKeyService, CredentialPolicy, CredentialService, JwtManager, RateLimiter};
use vigil_interfaces::{AuditSink, RepositoryFactory};
use vigil_rbac::RoleService;

/// Application context containing all service dependencies
#[derive(Clone)]
pub struct AppContext {
    /// Repository factory, for the few reads without a service wrapper
    pub repositories: Arc<dyn RepositoryFactory>,
    pub credentials: CredentialService,
    pub roles: RoleService,
    pub api_keys: Arc<ApiKeyService>,
    pub tokens: Arc<JwtManager>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Assemble the full service stack over one repository factory
    pub fn new(
        repositories: Arc<dyn RepositoryFactory>,
        audit: Arc<dyn AuditSink>,
        tokens: Arc<JwtManager>,
    ) -> Self {
        Self {
            credentials: CredentialService::new(
                repositories.clone(),
                audit.clone(),
                tokens.clone(),
                CredentialPolicy::default(),
            ),
            roles: RoleService::new(repositories.clone(), audit.clone()),
            api_keys: Arc::new(ApiKeyService::new(repositories.clone(), audit)),
            rate_limiter: Arc::new(RateLimiter::new(repositories.clone())),
            tokens,
            repositories,
        }
    }

    /// Swap the credential service, keeping the rest of the stack
    pub fn with_credentials(mut self, credentials: CredentialService) -> Self {
        self.credentials = credentials;
        self
    }
}
