//! Credential and session lifecycle
//!
//! Login with lockout, registration with organization bootstrap, refresh
//! token rotation, logout, password change and the password reset flow.
//! Refresh and reset secrets are random 64-hex values persisted only as
//! SHA-256 digests; access tokens come from [`JwtManager`] and are never
//! persisted at all.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use vigil_api_types::{UnifiedSession, UnifiedUser};
use vigil_interfaces::{
    AuditEvent, AuditSink, DatabaseError, NewPasswordResetToken, NewRefreshToken, NewUser, RepositoryFactory,
    UserRecord,
};
use vigil_rbac::{catalog, PermissionSet};

use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;
use crate::secrets::{generate_secret_hex, sha256_hex};
use crate::token::JwtManager;

/// Tunable authentication policy
#[derive(Debug, Clone)]
pub struct CredentialPolicy {
    /// Consecutive failures that lock the account
    pub lockout_threshold: i32,
    /// How long a lock lasts
    pub lockout_duration: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            lockout_duration: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::hours(1),
        }
    }
}

/// A user together with their resolved authorization state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user: UnifiedUser,
    pub roles: Vec<String>,
    pub permissions: PermissionSet,
}

/// Result of a successful login, registration or refresh.
///
/// `refresh_token` is the opaque plaintext secret; this is the only time it
/// exists outside the presenting client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthenticatedUser,
}

/// Credential and session service
#[derive(Clone)]
pub struct CredentialService {
    repositories: Arc<dyn RepositoryFactory>,
    audit: Arc<dyn AuditSink>,
    tokens: Arc<JwtManager>,
    hasher: PasswordHasher,
    policy: CredentialPolicy,
}

impl CredentialService {
    /// Create a new credential service
    pub fn new(
        repositories: Arc<dyn RepositoryFactory>,
        audit: Arc<dyn AuditSink>,
        tokens: Arc<JwtManager>,
        policy: CredentialPolicy,
    ) -> Self {
        Self {
            repositories,
            audit,
            tokens,
            hasher: PasswordHasher::new(),
            policy,
        }
    }

    /// Replace the password hasher. Tests use a low-cost hasher.
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Register a new organization with its first user.
    ///
    /// Creates the organization, seeds the three system roles and assigns
    /// Admin to the new user, all in one transaction, then issues a session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        organization_name: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<IssuedSession> {
        let email = normalize_email(email)?;
        validate_password(password)?;
        let organization_name = organization_name.trim();
        if organization_name.is_empty() {
            return Err(AuthError::validation("Organization name cannot be empty"));
        }
        if organization_name.len() > 200 {
            return Err(AuthError::validation("Organization name cannot exceed 200 characters"));
        }

        let password_hash = self.hasher.hash(password)?;
        let bootstrap = self
            .repositories
            .organization_repository()
            .create_with_owner(
                organization_name,
                NewUser {
                    email: email.clone(),
                    password_hash,
                },
                catalog::system_role_seeds(),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::Constraint { .. } => {
                    AuthError::duplicate("An account with this email already exists")
                }
                other => AuthError::from(other),
            })?;

        let organization_id = bootstrap.organization.id.as_i32().unwrap_or_default();
        info!(
            user_id = bootstrap.owner.id,
            organization_id, "organization registered"
        );
        self.audit.record(
            self.event("auth.register", "organization", Some(bootstrap.owner.id), client_ip)
                .with_resource_id(bootstrap.organization.id.as_str())
                .with_detail("name", bootstrap.organization.name.clone()),
        );

        let (roles, permissions) = self.resolve_authorization(bootstrap.owner.id).await?;
        self.issue_session(&bootstrap.owner, roles, permissions, None).await
    }

    /// Authenticate by email and password.
    ///
    /// The failure message never says whether the email or the password was
    /// wrong. Wrong passwords are counted atomically at the store; the
    /// attempt that reaches the threshold locks the account. A lock that has
    /// already expired is ignored and the attempt evaluated normally.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<String>,
        client_ip: Option<&str>,
    ) -> AuthResult<IssuedSession> {
        let users = self.repositories.user_repository();
        let Some(user) = users.find_by_email(email.trim().to_lowercase().as_str()).await? else {
            debug!("login attempt for unknown email");
            return Err(AuthError::invalid_credentials());
        };

        if let Some(locked_until) = user.locked_until {
            if locked_until > Utc::now() {
                warn!(user_id = user.id, "login attempt on locked account");
                self.audit.record(
                    self.event("auth.login.failed", "user", Some(user.id), client_ip)
                        .with_detail("reason", "locked"),
                );
                return Err(AuthError::AccountLocked {
                    unlock_at: locked_until,
                });
            }
        }

        if !self.hasher.verify(password, &user.password_hash)? {
            let failure = users
                .register_failed_login(user.id, self.policy.lockout_threshold, self.policy.lockout_duration)
                .await?;

            self.audit.record(
                self.event("auth.login.failed", "user", Some(user.id), client_ip)
                    .with_detail("attempts", failure.attempts),
            );

            return Err(match failure.locked_until {
                Some(unlock_at) => {
                    warn!(user_id = user.id, attempts = failure.attempts, "account locked");
                    self.audit
                        .record(self.event("auth.lockout", "user", Some(user.id), client_ip));
                    AuthError::AccountLocked { unlock_at }
                }
                None => AuthError::InvalidCredentials {
                    attempts_remaining: Some(self.policy.lockout_threshold - failure.attempts),
                },
            });
        }

        users.record_login_success(user.id).await?;
        let (roles, permissions) = self.resolve_authorization(user.id).await?;
        let session = self.issue_session(&user, roles, permissions, device_info).await?;

        info!(user_id = user.id, "login successful");
        self.audit
            .record(self.event("auth.login", "user", Some(user.id), client_ip));
        Ok(session)
    }

    /// Exchange a refresh secret for a fresh token pair.
    ///
    /// The matched row is deleted before anything is issued; the delete's
    /// affected-row count arbitrates concurrent redemptions of one secret.
    pub async fn refresh(&self, refresh_token: &str, device_info: Option<String>) -> AuthResult<IssuedSession> {
        let tokens = self.repositories.refresh_token_repository();
        let row = tokens
            .find_valid_by_hash(&sha256_hex(refresh_token))
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if tokens.delete_by_id(row.id).await? == 0 {
            debug!(token_id = row.id, "refresh token already redeemed");
            return Err(AuthError::TokenInvalid);
        }

        let user = self
            .repositories
            .user_repository()
            .find_by_id(row.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let (roles, permissions) = self.resolve_authorization(user.id).await?;
        self.issue_session(&user, roles, permissions, device_info.or(row.device_info))
            .await
    }

    /// Revoke every refresh session for a user. Returns how many were revoked.
    pub async fn logout(&self, user_id: i32, client_ip: Option<&str>) -> AuthResult<u64> {
        let revoked = self
            .repositories
            .refresh_token_repository()
            .delete_all_for_user(user_id)
            .await?;

        info!(user_id, revoked, "logged out");
        self.audit.record(
            self.event("auth.logout", "user", Some(user_id), client_ip)
                .with_detail("sessions", revoked),
        );
        Ok(revoked)
    }

    /// List the caller's active refresh sessions, metadata only
    pub async fn list_sessions(&self, user_id: i32) -> AuthResult<Vec<UnifiedSession>> {
        Ok(self
            .repositories
            .refresh_token_repository()
            .list_for_user(user_id)
            .await?)
    }

    /// Revoke one refresh session the caller owns. The owner check lives in
    /// the delete predicate, so a foreign session id reads as not found.
    pub async fn revoke_session(&self, user_id: i32, session_id: i32, client_ip: Option<&str>) -> AuthResult<()> {
        let deleted = self
            .repositories
            .refresh_token_repository()
            .delete_by_id_for_user(session_id, user_id)
            .await?;
        if deleted == 0 {
            return Err(AuthError::SessionNotFound { session_id });
        }

        self.audit.record(
            self.event("auth.session.revoke", "session", Some(user_id), client_ip)
                .with_resource_id(session_id.to_string()),
        );
        Ok(())
    }

    /// Issue a password reset secret for an existing account.
    ///
    /// Unknown emails get the same `Ok` as known ones; the returned secret
    /// goes to the delivery collaborator and never into an HTTP response.
    /// The store does one extra insert for a known email, a timing
    /// asymmetry this implementation accepts since the response payload is
    /// identical either way.
    pub async fn request_password_reset(&self, email: &str, client_ip: Option<&str>) -> AuthResult<Option<String>> {
        let Some(user) = self
            .repositories
            .user_repository()
            .find_by_email(email.trim().to_lowercase().as_str())
            .await?
        else {
            debug!("password reset requested for unknown email");
            return Ok(None);
        };

        let secret = generate_secret_hex::<32>();
        self.repositories
            .password_reset_token_repository()
            .create(NewPasswordResetToken {
                user_id: user.id,
                token_hash: sha256_hex(&secret),
                expires_at: Utc::now() + self.policy.reset_token_ttl,
            })
            .await?;

        info!(user_id = user.id, "password reset requested");
        self.audit
            .record(self.event("auth.password.reset.request", "user", Some(user.id), client_ip));
        Ok(Some(secret))
    }

    /// Consume a reset secret and set a new password.
    ///
    /// The `used` flip is the single-use arbiter: of two concurrent confirms
    /// with one secret, exactly one proceeds. Every refresh session is
    /// revoked afterwards.
    pub async fn reset_password(&self, reset_token: &str, new_password: &str, client_ip: Option<&str>) -> AuthResult<()> {
        validate_password(new_password)?;

        let resets = self.repositories.password_reset_token_repository();
        let row = resets
            .find_valid_by_hash(&sha256_hex(reset_token))
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if !resets.mark_used(row.id).await? {
            debug!(token_id = row.id, "reset token already consumed");
            return Err(AuthError::TokenInvalid);
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.repositories
            .user_repository()
            .update_password(row.user_id, &password_hash)
            .await?;
        let revoked = self
            .repositories
            .refresh_token_repository()
            .delete_all_for_user(row.user_id)
            .await?;

        info!(user_id = row.user_id, revoked, "password reset completed");
        self.audit
            .record(self.event("auth.password.reset", "user", Some(row.user_id), client_ip));
        Ok(())
    }

    /// Change the password of an authenticated user.
    ///
    /// Requires the current password; revokes every refresh session so other
    /// devices have to log in again.
    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
        client_ip: Option<&str>,
    ) -> AuthResult<()> {
        validate_password(new_password)?;

        let users = self.repositories.user_repository();
        let user = users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound { user_id })?;

        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Err(AuthError::invalid_credentials());
        }

        let password_hash = self.hasher.hash(new_password)?;
        users.update_password(user_id, &password_hash).await?;
        let revoked = self
            .repositories
            .refresh_token_repository()
            .delete_all_for_user(user_id)
            .await?;

        info!(user_id, revoked, "password changed");
        self.audit
            .record(self.event("auth.password.change", "user", Some(user_id), client_ip));
        Ok(())
    }

    /// The authenticated user with live-resolved roles and permissions
    pub async fn authenticated_user(&self, user_id: i32) -> AuthResult<AuthenticatedUser> {
        let user = self
            .repositories
            .user_repository()
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound { user_id })?;

        let (roles, permissions) = self.resolve_authorization(user_id).await?;
        Ok(AuthenticatedUser {
            user: user.into(),
            roles,
            permissions,
        })
    }

    async fn resolve_authorization(&self, user_id: i32) -> AuthResult<(Vec<String>, PermissionSet)> {
        let roles_repo = self.repositories.role_repository();
        let roles = roles_repo
            .roles_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.name)
            .collect();
        let permissions = PermissionSet::from_names(roles_repo.permission_names_for_user(user_id).await?);
        Ok((roles, permissions))
    }

    async fn issue_session(
        &self,
        user: &UserRecord,
        roles: Vec<String>,
        permissions: PermissionSet,
        device_info: Option<String>,
    ) -> AuthResult<IssuedSession> {
        let access_token = self.tokens.generate_access_token(
            user.id,
            &user.email,
            user.organization_id,
            roles.clone(),
            permissions.iter().map(str::to_string).collect(),
        )?;

        let refresh_token = generate_secret_hex::<32>();
        self.repositories
            .refresh_token_repository()
            .create(NewRefreshToken {
                user_id: user.id,
                token_hash: sha256_hex(&refresh_token),
                device_info,
                expires_at: Utc::now() + self.policy.refresh_token_ttl,
            })
            .await?;

        Ok(IssuedSession {
            access_token,
            refresh_token,
            user: AuthenticatedUser {
                user: user.clone().into(),
                roles,
                permissions,
            },
        })
    }

    fn event(&self, action: &str, resource_type: &str, user_id: Option<i32>, client_ip: Option<&str>) -> AuditEvent {
        let mut event = AuditEvent::new(action, resource_type);
        if let Some(user_id) = user_id {
            event = event.with_user(user_id);
        }
        if let Some(ip) = client_ip {
            event = event.with_ip(ip);
        }
        event
    }
}

fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();
    if email.len() < 3 || email.len() > 254 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AuthError::validation("A valid email address is required"));
    }
    Ok(email)
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < 8 {
        return Err(AuthError::validation("Password must be at least 8 characters"));
    }
    if password.len() > 128 {
        return Err(AuthError::validation("Password cannot exceed 128 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenConfig;
    use mockall::predicate::eq;
    use vigil_api_types::ApiId;
    use vigil_interfaces::testing::{user_record_fixture, RecordingSink, TestFactory};
    use vigil_interfaces::{LoginFailure, OrganizationBootstrap, RefreshTokenRecord};
    use vigil_api_types::UnifiedOrganization;

    const TEST_SECRET: &str = "a-test-signing-secret-of-sufficient-length";

    fn test_service(factory: TestFactory) -> (CredentialService, Arc<RecordingSink>, Arc<JwtManager>) {
        let sink = Arc::new(RecordingSink::default());
        let tokens = Arc::new(JwtManager::new(TokenConfig::new(TEST_SECRET)));
        let service = CredentialService::new(
            Arc::new(factory),
            sink.clone(),
            tokens.clone(),
            CredentialPolicy::default(),
        )
        .with_hasher(PasswordHasher::with_cost(4));
        (service, sink, tokens)
    }

    fn user_with_password(id: i32, email: &str, organization_id: i32, password: &str) -> UserRecord {
        let mut user = user_record_fixture(id, email, organization_id);
        user.password_hash = PasswordHasher::with_cost(4).hash(password).unwrap();
        user
    }

    fn refresh_row(id: i32, user_id: i32, token_hash: &str) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id,
            user_id,
            token_hash: token_hash.to_string(),
            device_info: Some("cli".to_string()),
            expires_at: Utc::now() + Duration::days(6),
            created_at: Utc::now() - Duration::days(1),
        }
    }

    fn expect_authorization(factory: &mut TestFactory, user_id: i32) {
        factory
            .roles
            .expect_roles_for_user()
            .with(eq(user_id))
            .returning(|_| Ok(vec![]));
        factory
            .roles
            .expect_permission_names_for_user()
            .with(eq(user_id))
            .returning(|_| Ok(vec!["alerts:read".to_string()]));
    }

    #[tokio::test]
    async fn test_login_unknown_email_reveals_nothing() {
        let mut factory = TestFactory::default();
        factory.users.expect_find_by_email().returning(|_| Ok(None));

        let (service, _, _) = test_service(factory);
        let err = service.login("ghost@acme.example", "whatever1", None, None).await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::InvalidCredentials {
                attempts_remaining: None
            }
        ));
    }

    #[tokio::test]
    async fn test_login_locked_account_short_circuits() {
        let unlock_at = Utc::now() + Duration::minutes(10);
        let mut factory = TestFactory::default();
        factory.users.expect_find_by_email().returning(move |_| {
            let mut user = user_with_password(7, "ops@acme.example", 3, "correct-pw");
            user.locked_until = Some(unlock_at);
            Ok(Some(user))
        });

        let (service, sink, _) = test_service(factory);
        // Even the correct password is rejected while the lock holds
        let err = service
            .login("ops@acme.example", "correct-pw", None, Some("203.0.113.9"))
            .await
            .unwrap_err();

        match err {
            AuthError::AccountLocked { unlock_at: at } => assert_eq!(at, unlock_at),
            other => panic!("expected AccountLocked, got {other:?}"),
        }
        assert_eq!(sink.events()[0].action, "auth.login.failed");
    }

    #[tokio::test]
    async fn test_login_wrong_password_reports_attempts_remaining() {
        let mut factory = TestFactory::default();
        factory
            .users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user_with_password(7, "ops@acme.example", 3, "correct-pw"))));
        factory
            .users
            .expect_register_failed_login()
            .withf(|user_id, threshold, duration| {
                *user_id == 7 && *threshold == 5 && *duration == Duration::minutes(15)
            })
            .returning(|_, _, _| {
                Ok(LoginFailure {
                    attempts: 2,
                    locked_until: None,
                })
            });

        let (service, _, _) = test_service(factory);
        let err = service.login("ops@acme.example", "wrong-pw", None, None).await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::InvalidCredentials {
                attempts_remaining: Some(3)
            }
        ));
    }

    #[tokio::test]
    async fn test_login_threshold_failure_locks_and_audits() {
        let unlock_at = Utc::now() + Duration::minutes(15);
        let mut factory = TestFactory::default();
        factory
            .users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user_with_password(7, "ops@acme.example", 3, "correct-pw"))));
        factory.users.expect_register_failed_login().returning(move |_, _, _| {
            Ok(LoginFailure {
                attempts: 5,
                locked_until: Some(unlock_at),
            })
        });

        let (service, sink, _) = test_service(factory);
        let err = service.login("ops@acme.example", "wrong-pw", None, None).await.unwrap_err();

        assert!(matches!(err, AuthError::AccountLocked { .. }));
        let actions: Vec<String> = sink.events().into_iter().map(|e| e.action).collect();
        assert!(actions.contains(&"auth.lockout".to_string()));
    }

    #[tokio::test]
    async fn test_login_success_issues_tokens_and_resolves_authorization() {
        let mut factory = TestFactory::default();
        factory
            .users
            .expect_find_by_email()
            .withf(|email: &str| email == "ops@acme.example")
            .returning(|_| Ok(Some(user_with_password(7, "ops@acme.example", 3, "correct-pw"))));
        factory.users.expect_record_login_success().with(eq(7)).returning(|_| Ok(()));
        factory
            .roles
            .expect_roles_for_user()
            .returning(|_| Ok(vec![vigil_interfaces::testing::role_fixture(4, "Operator", 3, true)]));
        factory
            .roles
            .expect_permission_names_for_user()
            .returning(|_| Ok(vec!["alerts:read".to_string(), "containers:read".to_string()]));
        factory
            .refresh_tokens
            .expect_create()
            .withf(|token: &NewRefreshToken| {
                token.user_id == 7 && token.token_hash.len() == 64 && token.device_info.as_deref() == Some("cli")
            })
            .returning(|token| Ok(refresh_row(91, token.user_id, &token.token_hash)));

        let (service, sink, tokens) = test_service(factory);
        let session = service
            .login("Ops@Acme.example", "correct-pw", Some("cli".to_string()), Some("203.0.113.9"))
            .await
            .unwrap();

        assert_eq!(session.refresh_token.len(), 64);
        assert_eq!(session.user.roles, vec!["Operator"]);
        assert!(session.user.permissions.has("alerts:read"));

        let claims = tokens.validate_access_token(&session.access_token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.organization_id, 3);
        assert_eq!(claims.roles, vec!["Operator"]);
        assert_eq!(claims.permissions, vec!["alerts:read", "containers:read"]);

        let actions: Vec<String> = sink.events().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["auth.login"]);
    }

    #[tokio::test]
    async fn test_refresh_rotates_the_presented_secret() {
        let presented = "aa".repeat(32);
        let presented_hash = sha256_hex(&presented);
        let expected_hash = presented_hash.clone();
        let mut factory = TestFactory::default();
        factory
            .refresh_tokens
            .expect_find_valid_by_hash()
            .withf(move |hash| hash == expected_hash)
            .returning(|hash| Ok(Some(refresh_row(91, 7, hash))));
        factory.refresh_tokens.expect_delete_by_id().with(eq(91)).returning(|_| Ok(1));
        factory
            .users
            .expect_find_by_id()
            .with(eq(7))
            .returning(|_| Ok(Some(user_record_fixture(7, "ops@acme.example", 3))));
        expect_authorization(&mut factory, 7);
        factory
            .refresh_tokens
            .expect_create()
            .withf(move |token: &NewRefreshToken| token.token_hash != presented_hash)
            .returning(|token| Ok(refresh_row(92, token.user_id, &token.token_hash)));

        let (service, _, _) = test_service(factory);
        let session = service.refresh(&presented, None).await.unwrap();

        assert_ne!(session.refresh_token, presented);
        assert_eq!(session.user.user.id.as_i32(), Some(7));
    }

    #[tokio::test]
    async fn test_refresh_lost_race_is_invalid() {
        let mut factory = TestFactory::default();
        factory
            .refresh_tokens
            .expect_find_valid_by_hash()
            .returning(|hash| Ok(Some(refresh_row(91, 7, hash))));
        factory.refresh_tokens.expect_delete_by_id().returning(|_| Ok(0));

        let (service, _, _) = test_service(factory);
        let err = service.refresh(&"aa".repeat(32), None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_refresh_unknown_secret_is_invalid() {
        let mut factory = TestFactory::default();
        factory.refresh_tokens.expect_find_valid_by_hash().returning(|_| Ok(None));

        let (service, _, _) = test_service(factory);
        let err = service.refresh("deadbeef", None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let mut factory = TestFactory::default();
        factory.organizations.expect_create_with_owner().returning(|_, _, _| {
            Err(DatabaseError::Constraint {
                message: "UNIQUE constraint failed: users.email".to_string(),
            })
        });

        let (service, _, _) = test_service(factory);
        let err = service
            .register("ops@acme.example", "longenough", "Acme", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateResource { .. }));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_input() {
        let (service, _, _) = test_service(TestFactory::default());

        let err = service.register("not-an-email", "longenough", "Acme", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));

        let err = service.register("ops@acme.example", "short", "Acme", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));

        let err = service.register("ops@acme.example", "longenough", "   ", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_register_bootstraps_and_issues_session() {
        let mut factory = TestFactory::default();
        factory
            .organizations
            .expect_create_with_owner()
            .withf(|name, owner: &NewUser, seeds| {
                name == "Acme"
                    && owner.email == "ops@acme.example"
                    && owner.password_hash.starts_with("$2b$")
                    && seeds.len() == 3
                    && seeds[0].name == "Admin"
            })
            .returning(|name, owner, _| {
                let now = Utc::now();
                let mut user = user_record_fixture(7, &owner.email, 3);
                user.password_hash = owner.password_hash;
                Ok(OrganizationBootstrap {
                    organization: UnifiedOrganization {
                        id: ApiId::from_i32(3),
                        name: name.to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                    owner: user,
                    roles: vec![],
                })
            });
        expect_authorization(&mut factory, 7);
        factory
            .refresh_tokens
            .expect_create()
            .returning(|token| Ok(refresh_row(91, token.user_id, &token.token_hash)));

        let (service, sink, _) = test_service(factory);
        let session = service
            .register("Ops@Acme.example", "longenough", "  Acme  ", Some("203.0.113.9"))
            .await
            .unwrap();

        assert_eq!(session.user.user.email, "ops@acme.example");
        assert!(!session.access_token.is_empty());

        let events = sink.events();
        assert_eq!(events[0].action, "auth.register");
        assert_eq!(events[0].resource_id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_reset_request_is_uniform_for_unknown_emails() {
        let mut factory = TestFactory::default();
        factory.users.expect_find_by_email().returning(|_| Ok(None));

        let (service, sink, _) = test_service(factory);
        let issued = service.request_password_reset("ghost@acme.example", None).await.unwrap();

        assert!(issued.is_none());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_reset_request_persists_only_the_hash() {
        let mut factory = TestFactory::default();
        factory
            .users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user_record_fixture(7, "ops@acme.example", 3))));
        factory
            .reset_tokens
            .expect_create()
            .withf(|token: &NewPasswordResetToken| token.user_id == 7 && token.token_hash.len() == 64)
            .returning(|token| {
                Ok(vigil_interfaces::PasswordResetTokenRecord {
                    id: 31,
                    user_id: token.user_id,
                    token_hash: token.token_hash,
                    expires_at: token.expires_at,
                    used: false,
                    created_at: Utc::now(),
                })
            });

        let (service, _, _) = test_service(factory);
        let secret = service
            .request_password_reset("ops@acme.example", None)
            .await
            .unwrap()
            .expect("known account issues a secret");

        assert_eq!(secret.len(), 64);
    }

    #[tokio::test]
    async fn test_reset_password_consumed_token_is_invalid() {
        let mut factory = TestFactory::default();
        factory.reset_tokens.expect_find_valid_by_hash().returning(|hash| {
            Ok(Some(vigil_interfaces::PasswordResetTokenRecord {
                id: 31,
                user_id: 7,
                token_hash: hash.to_string(),
                expires_at: Utc::now() + Duration::minutes(30),
                used: false,
                created_at: Utc::now(),
            }))
        });
        factory.reset_tokens.expect_mark_used().with(eq(31)).returning(|_| Ok(false));

        let (service, _, _) = test_service(factory);
        let err = service.reset_password(&"bb".repeat(32), "newpassword", None).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_reset_password_updates_hash_and_revokes_sessions() {
        let mut factory = TestFactory::default();
        factory.reset_tokens.expect_find_valid_by_hash().returning(|hash| {
            Ok(Some(vigil_interfaces::PasswordResetTokenRecord {
                id: 31,
                user_id: 7,
                token_hash: hash.to_string(),
                expires_at: Utc::now() + Duration::minutes(30),
                used: false,
                created_at: Utc::now(),
            }))
        });
        factory.reset_tokens.expect_mark_used().returning(|_| Ok(true));
        factory
            .users
            .expect_update_password()
            .withf(|user_id, hash| *user_id == 7 && hash.starts_with("$2b$") && hash != "newpassword")
            .returning(|_, _| Ok(()));
        factory
            .refresh_tokens
            .expect_delete_all_for_user()
            .with(eq(7))
            .returning(|_| Ok(2));

        let (service, sink, _) = test_service(factory);
        service.reset_password(&"bb".repeat(32), "newpassword", None).await.unwrap();

        assert_eq!(sink.events()[0].action, "auth.password.reset");
    }

    #[tokio::test]
    async fn test_change_password_requires_the_current_one() {
        let mut factory = TestFactory::default();
        factory
            .users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user_with_password(7, "ops@acme.example", 3, "current-pw"))));

        let (service, _, _) = test_service(factory);
        let err = service
            .change_password(7, "not-the-current", "replacement", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials { .. }));
    }

    #[tokio::test]
    async fn test_revoke_session_misses_foreign_rows() {
        let mut factory = TestFactory::default();
        factory
            .refresh_tokens
            .expect_delete_by_id_for_user()
            .with(eq(91), eq(7))
            .returning(|_, _| Ok(0));

        let (service, _, _) = test_service(factory);
        let err = service.revoke_session(7, 91, None).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound { session_id: 91 }));
    }

    #[tokio::test]
    async fn test_logout_counts_revoked_sessions() {
        let mut factory = TestFactory::default();
        factory.refresh_tokens.expect_delete_all_for_user().with(eq(7)).returning(|_| Ok(3));

        let (service, sink, _) = test_service(factory);
        let revoked = service.logout(7, None).await.unwrap();

        assert_eq!(revoked, 3);
        assert_eq!(sink.events()[0].action, "auth.logout");
        assert_eq!(sink.events()[0].details["sessions"], 3);
    }
}
