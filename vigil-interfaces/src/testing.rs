//! Mock repositories and fixtures for testing
//!
//! This module provides mockall-backed implementations of the repository
//! traits plus a factory over them, so service crates can unit test against
//! the interfaces without a database. Enabled by the `testing` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mockall::mock;

use vigil_api_types::{
    ApiId, ListResponse, PaginationInput, UnifiedApiKey, UnifiedOrganization, UnifiedPermission, UnifiedRole,
    UnifiedSession,
};

use crate::{
    ApiKeyRepository, AuditEvent, AuditSink, DatabaseError, LoginFailure, NewApiKey, NewPasswordResetToken,
    NewRefreshToken, NewRole, NewUser, OrganizationBootstrap, OrganizationRepository, PasswordResetTokenRecord,
    PasswordResetTokenRepository, PermissionRepository, RateLimitRepository, RateWindow, RefreshTokenRecord,
    RefreshTokenRepository, Repository, RepositoryFactory, RoleChanges, RoleDeleteOutcome, RoleRepository,
    SystemRoleSeed, UserRecord, UserRepository,
};

mock! {
    pub UserRepo {}

    #[async_trait]
    impl Repository for UserRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl UserRepository for UserRepo {
        async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, DatabaseError>;
        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
        async fn create(&self, organization_id: i32, user: NewUser) -> Result<UserRecord, DatabaseError>;
        async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), DatabaseError>;
        async fn register_failed_login(
            &self,
            user_id: i32,
            threshold: i32,
            lock_duration: Duration,
        ) -> Result<LoginFailure, DatabaseError>;
        async fn record_login_success(&self, user_id: i32) -> Result<(), DatabaseError>;
    }
}

mock! {
    pub OrganizationRepo {}

    #[async_trait]
    impl Repository for OrganizationRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl OrganizationRepository for OrganizationRepo {
        async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedOrganization>, DatabaseError>;
        async fn create_with_owner(
            &self,
            name: &str,
            owner: NewUser,
            system_roles: Vec<SystemRoleSeed>,
        ) -> Result<OrganizationBootstrap, DatabaseError>;
    }
}

mock! {
    pub RoleRepo {}

    #[async_trait]
    impl Repository for RoleRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl RoleRepository for RoleRepo {
        async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedRole>, DatabaseError>;
        async fn list_for_organization(
            &self,
            organization_id: i32,
            pagination: PaginationInput,
        ) -> Result<ListResponse<UnifiedRole>, DatabaseError>;
        async fn create_with_permissions(&self, role: NewRole) -> Result<UnifiedRole, DatabaseError>;
        async fn update_with_permissions(
            &self,
            role_id: i32,
            changes: RoleChanges,
        ) -> Result<UnifiedRole, DatabaseError>;
        async fn delete_conditional(&self, role_id: i32) -> Result<RoleDeleteOutcome, DatabaseError>;
        async fn assign_to_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError>;
        async fn remove_from_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError>;
        async fn roles_for_user(&self, user_id: i32) -> Result<Vec<UnifiedRole>, DatabaseError>;
        async fn permission_names_for_user(&self, user_id: i32) -> Result<Vec<String>, DatabaseError>;
    }
}

mock! {
    pub PermissionRepo {}

    #[async_trait]
    impl Repository for PermissionRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl PermissionRepository for PermissionRepo {
        async fn list_all(&self) -> Result<Vec<UnifiedPermission>, DatabaseError>;
        async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<UnifiedPermission>, DatabaseError>;
        async fn find_by_names(&self, names: &[String]) -> Result<Vec<UnifiedPermission>, DatabaseError>;
    }
}

mock! {
    pub RefreshTokenRepo {}

    #[async_trait]
    impl Repository for RefreshTokenRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl RefreshTokenRepository for RefreshTokenRepo {
        async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, DatabaseError>;
        async fn find_valid_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;
        async fn delete_by_id(&self, id: i32) -> Result<u64, DatabaseError>;
        async fn delete_by_id_for_user(&self, id: i32, user_id: i32) -> Result<u64, DatabaseError>;
        async fn delete_all_for_user(&self, user_id: i32) -> Result<u64, DatabaseError>;
        async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedSession>, DatabaseError>;
    }
}

mock! {
    pub PasswordResetTokenRepo {}

    #[async_trait]
    impl Repository for PasswordResetTokenRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl PasswordResetTokenRepository for PasswordResetTokenRepo {
        async fn create(&self, token: NewPasswordResetToken) -> Result<PasswordResetTokenRecord, DatabaseError>;
        async fn find_valid_by_hash(
            &self,
            token_hash: &str,
        ) -> Result<Option<PasswordResetTokenRecord>, DatabaseError>;
        async fn mark_used(&self, id: i32) -> Result<bool, DatabaseError>;
    }
}

mock! {
    pub ApiKeyRepo {}

    #[async_trait]
    impl Repository for ApiKeyRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl ApiKeyRepository for ApiKeyRepo {
        async fn create(&self, key: NewApiKey) -> Result<UnifiedApiKey, DatabaseError>;
        async fn find_by_hash(&self, key_hash: &str) -> Result<Option<UnifiedApiKey>, DatabaseError>;
        async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedApiKey>, DatabaseError>;
        async fn touch_last_used(&self, key_id: i32) -> Result<(), DatabaseError>;
        async fn delete(&self, key_id: i32) -> Result<u64, DatabaseError>;
        async fn delete_for_user(&self, key_id: i32, user_id: i32) -> Result<u64, DatabaseError>;
    }
}

mock! {
    pub RateLimitRepo {}

    #[async_trait]
    impl Repository for RateLimitRepo {
        async fn health_check(&self) -> Result<(), DatabaseError>;
    }

    #[async_trait]
    impl RateLimitRepository for RateLimitRepo {
        async fn fetch(&self, key: &str) -> Result<Option<RateWindow>, DatabaseError>;
        async fn create_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<bool, DatabaseError>;
        async fn reset_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<(), DatabaseError>;
        async fn increment(&self, key: &str) -> Result<(), DatabaseError>;
    }
}

/// Factory over the mock repositories. Set expectations on the public
/// fields before wrapping it in an `Arc`.
#[derive(Default)]
pub struct TestFactory {
    pub users: MockUserRepo,
    pub organizations: MockOrganizationRepo,
    pub roles: MockRoleRepo,
    pub permissions: MockPermissionRepo,
    pub refresh_tokens: MockRefreshTokenRepo,
    pub reset_tokens: MockPasswordResetTokenRepo,
    pub api_keys: MockApiKeyRepo,
    pub rate_limits: MockRateLimitRepo,
}

#[async_trait]
impl RepositoryFactory for TestFactory {
    fn user_repository(&self) -> &dyn UserRepository {
        &self.users
    }

    fn organization_repository(&self) -> &dyn OrganizationRepository {
        &self.organizations
    }

    fn role_repository(&self) -> &dyn RoleRepository {
        &self.roles
    }

    fn permission_repository(&self) -> &dyn PermissionRepository {
        &self.permissions
    }

    fn refresh_token_repository(&self) -> &dyn RefreshTokenRepository {
        &self.refresh_tokens
    }

    fn password_reset_token_repository(&self) -> &dyn PasswordResetTokenRepository {
        &self.reset_tokens
    }

    fn api_key_repository(&self) -> &dyn ApiKeyRepository {
        &self.api_keys
    }

    fn rate_limit_repository(&self) -> &dyn RateLimitRepository {
        &self.rate_limits
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Audit sink that captures events for assertions
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn permission_fixture(id: i32, name: &str) -> UnifiedPermission {
    let (resource, action) = name.split_once(':').unwrap_or((name, "read"));
    UnifiedPermission {
        id: ApiId::from_i32(id),
        name: name.to_string(),
        resource: resource.to_string(),
        action: action.to_string(),
        description: None,
    }
}

pub fn role_fixture(id: i32, name: &str, organization_id: i32, is_system_role: bool) -> UnifiedRole {
    let now = Utc::now();
    UnifiedRole {
        id: ApiId::from_i32(id),
        name: name.to_string(),
        description: None,
        organization_id: ApiId::from_i32(organization_id),
        is_system_role,
        permissions: vec![permission_fixture(1, "containers:read")],
        created_at: now,
        updated_at: now,
    }
}

pub fn user_record_fixture(id: i32, email: &str, organization_id: i32) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id,
        email: email.to_string(),
        password_hash: "$2b$12$fixturefixturefixturefi".to_string(),
        organization_id,
        failed_login_attempts: 0,
        locked_until: None,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}
