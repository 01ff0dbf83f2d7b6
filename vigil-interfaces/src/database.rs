//! Database repository interfaces
//!
//! This module defines the repository traits that enable dependency injection
//! and testing through interface segregation. Services depend on these
//! contracts, never on a concrete storage backend.
//!
//! Operations that are race-sensitive (failed-login counters, conditional
//! role deletion, refresh-token rotation, rate-limit windows) are shaped as
//! single trait calls so implementations can make them atomic at the store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vigil_api_types::{
    ListResponse, PaginationInput, UnifiedApiKey, UnifiedOrganization, UnifiedPermission, UnifiedRole, UnifiedSession,
    UnifiedUser,
};

/// Common database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Constraint violation: {message}")]
    Constraint { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Internal database error: {message}")]
    Internal { message: String },
}

/// Base repository trait with health check capability
#[async_trait]
pub trait Repository: Send + Sync {
    /// Check if the repository is healthy and can serve requests
    async fn health_check(&self) -> Result<(), DatabaseError>;
}

// =============================================================================
// Internal records
// =============================================================================

/// Full user row as stored, including credential material.
///
/// This type never crosses the API boundary; handlers convert to
/// [`UnifiedUser`], which carries no hash and no lockout counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub organization_id: i32,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UnifiedUser {
    fn from(record: UserRecord) -> Self {
        UnifiedUser {
            id: record.id.into(),
            email: record.email,
            organization_id: record.organization_id.into(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_login_at: record.last_login_at,
        }
    }
}

/// Parameters for creating a user. The password arrives pre-hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// Outcome of recording one failed login attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginFailure {
    /// Consecutive failure count after this attempt was recorded.
    pub attempts: i32,
    /// Set when this attempt crossed the lockout threshold.
    pub locked_until: Option<DateTime<Utc>>,
}

/// Definition of one role seeded alongside a new organization.
#[derive(Debug, Clone)]
pub struct SystemRoleSeed {
    pub name: String,
    pub description: String,
    pub permission_names: Vec<String>,
    /// Assign this role to the organization's first user.
    pub assign_to_owner: bool,
}

/// Everything created by the organization bootstrap transaction.
#[derive(Debug, Clone)]
pub struct OrganizationBootstrap {
    pub organization: UnifiedOrganization,
    pub owner: UserRecord,
    pub roles: Vec<UnifiedRole>,
}

/// Parameters for creating a role together with its permission set.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub organization_id: i32,
    pub is_system_role: bool,
    pub permission_ids: Vec<i32>,
}

/// Partial role update. `permission_ids` replaces the full set when present.
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
}

/// Outcome of a conditional role deletion.
///
/// The delete itself runs as one guarded statement; when zero rows are
/// affected the implementation re-queries to classify which guard held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeleteOutcome {
    Deleted,
    NotFound,
    SystemRole,
    HasAssignedUsers,
}

/// Refresh token row. Only the SHA-256 hash of the secret is stored.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for persisting a freshly issued refresh token.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i32,
    pub token_hash: String,
    pub device_info: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Password reset token row. Single-use: `used` flips exactly once.
#[derive(Debug, Clone)]
pub struct PasswordResetTokenRecord {
    pub id: i32,
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Parameters for persisting a password reset token.
#[derive(Debug, Clone)]
pub struct NewPasswordResetToken {
    pub user_id: i32,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Parameters for persisting an issued API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub name: String,
    pub key_hash: String,
    pub key_prefix: String,
    pub user_id: i32,
    pub organization_id: i32,
    pub scoped_permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// One rate-limit window row.
#[derive(Debug, Clone, PartialEq)]
pub struct RateWindow {
    pub requests: i32,
    pub window_start: DateTime<Utc>,
}

// =============================================================================
// User Repository
// =============================================================================

/// User repository interface
#[async_trait]
pub trait UserRepository: Repository {
    /// Find user by integer ID
    async fn find_by_id(&self, id: i32) -> Result<Option<UserRecord>, DatabaseError>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;

    /// Create a user inside an existing organization
    async fn create(&self, organization_id: i32, user: NewUser) -> Result<UserRecord, DatabaseError>;

    /// Update password hash
    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), DatabaseError>;

    /// Record one failed login attempt.
    ///
    /// The counter increment is atomic at the store. When the post-increment
    /// count reaches `threshold`, `locked_until` is set to now +
    /// `lock_duration`. Concurrent failures may both observe the threshold
    /// and both set the lock; the write is idempotent and no attempt is ever
    /// lost.
    async fn register_failed_login(
        &self,
        user_id: i32,
        threshold: i32,
        lock_duration: Duration,
    ) -> Result<LoginFailure, DatabaseError>;

    /// Record a successful login: zero the failure counter, clear any lock,
    /// and stamp `last_login_at`.
    async fn record_login_success(&self, user_id: i32) -> Result<(), DatabaseError>;
}

// =============================================================================
// Organization Repository
// =============================================================================

/// Organization repository interface
#[async_trait]
pub trait OrganizationRepository: Repository {
    /// Find organization by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedOrganization>, DatabaseError>;

    /// Create an organization, seed its system roles, create the first user
    /// and assign the marked seed roles to them, all in one transaction.
    ///
    /// No partially provisioned organization is ever observable: either the
    /// whole bootstrap commits or none of it exists.
    async fn create_with_owner(
        &self,
        name: &str,
        owner: NewUser,
        system_roles: Vec<SystemRoleSeed>,
    ) -> Result<OrganizationBootstrap, DatabaseError>;
}

// =============================================================================
// Role & Permission Repositories
// =============================================================================

/// Role repository interface
#[async_trait]
pub trait RoleRepository: Repository {
    /// Find role by ID, with its permission set
    async fn find_by_id(&self, id: i32) -> Result<Option<UnifiedRole>, DatabaseError>;

    /// List roles for an organization with pagination
    async fn list_for_organization(
        &self,
        organization_id: i32,
        pagination: PaginationInput,
    ) -> Result<ListResponse<UnifiedRole>, DatabaseError>;

    /// Create a role and its permission links in one transaction
    async fn create_with_permissions(&self, role: NewRole) -> Result<UnifiedRole, DatabaseError>;

    /// Apply a partial update in one transaction. A supplied permission set
    /// fully replaces the existing links.
    async fn update_with_permissions(&self, role_id: i32, changes: RoleChanges) -> Result<UnifiedRole, DatabaseError>;

    /// Delete a role with one conditional statement: the row goes away only
    /// if it exists, is not a system role, and has no user assignments.
    async fn delete_conditional(&self, role_id: i32) -> Result<RoleDeleteOutcome, DatabaseError>;

    /// Assign a role to a user. Returns false when the assignment already
    /// existed.
    async fn assign_to_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError>;

    /// Remove a role from a user. Returns false when there was nothing to
    /// remove.
    async fn remove_from_user(&self, user_id: i32, role_id: i32) -> Result<bool, DatabaseError>;

    /// All roles assigned to a user, with their permission sets
    async fn roles_for_user(&self, user_id: i32) -> Result<Vec<UnifiedRole>, DatabaseError>;

    /// Distinct permission names reachable through the user's roles
    async fn permission_names_for_user(&self, user_id: i32) -> Result<Vec<String>, DatabaseError>;
}

/// Permission catalog repository interface
#[async_trait]
pub trait PermissionRepository: Repository {
    /// List the full permission catalog
    async fn list_all(&self) -> Result<Vec<UnifiedPermission>, DatabaseError>;

    /// Find permissions by ID, in no particular order
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<UnifiedPermission>, DatabaseError>;

    /// Find permissions by name, in no particular order
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<UnifiedPermission>, DatabaseError>;
}

// =============================================================================
// Token Repositories
// =============================================================================

/// Refresh token repository interface
#[async_trait]
pub trait RefreshTokenRepository: Repository {
    /// Persist a freshly issued token hash
    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord, DatabaseError>;

    /// Find a non-expired row by secret hash. Expiry is enforced here, in the
    /// lookup predicate; expired rows are simply never returned.
    async fn find_valid_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Delete one row by ID, returning the affected-row count.
    ///
    /// Rotation uses this count as the race arbiter: of two concurrent
    /// redemptions of the same secret, exactly one observes 1.
    async fn delete_by_id(&self, id: i32) -> Result<u64, DatabaseError>;

    /// Delete one row owned by the given user, returning the affected count
    async fn delete_by_id_for_user(&self, id: i32, user_id: i32) -> Result<u64, DatabaseError>;

    /// Delete every row for a user, returning the affected count
    async fn delete_all_for_user(&self, user_id: i32) -> Result<u64, DatabaseError>;

    /// List the user's non-expired sessions, newest first. Hashes never leave
    /// the store.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedSession>, DatabaseError>;
}

/// Password reset token repository interface
#[async_trait]
pub trait PasswordResetTokenRepository: Repository {
    /// Persist a reset token hash
    async fn create(&self, token: NewPasswordResetToken) -> Result<PasswordResetTokenRecord, DatabaseError>;

    /// Find a row by secret hash that is neither expired nor used
    async fn find_valid_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetTokenRecord>, DatabaseError>;

    /// Flip `used` to true, guarded on it still being false. Returns whether
    /// this call was the one that consumed the token.
    async fn mark_used(&self, id: i32) -> Result<bool, DatabaseError>;
}

// =============================================================================
// API Key Repository
// =============================================================================

/// API key repository interface
#[async_trait]
pub trait ApiKeyRepository: Repository {
    /// Persist an issued key. The plaintext secret never reaches the store.
    async fn create(&self, key: NewApiKey) -> Result<UnifiedApiKey, DatabaseError>;

    /// Find a key by secret hash, expired or not; the caller distinguishes
    /// expired from absent.
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<UnifiedApiKey>, DatabaseError>;

    /// List a user's keys, metadata only
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<UnifiedApiKey>, DatabaseError>;

    /// Stamp `last_used_at`. Callers treat failures as best-effort.
    async fn touch_last_used(&self, key_id: i32) -> Result<(), DatabaseError>;

    /// Delete a key by ID, returning the affected count
    async fn delete(&self, key_id: i32) -> Result<u64, DatabaseError>;

    /// Delete a key owned by the given user, returning the affected count
    async fn delete_for_user(&self, key_id: i32, user_id: i32) -> Result<u64, DatabaseError>;
}

// =============================================================================
// Rate Limit Repository
// =============================================================================

/// Rate-limit window repository interface
///
/// One row per limiter key, guarded by a unique key column. The service owns
/// the window arithmetic; the repository owns row-level atomicity.
#[async_trait]
pub trait RateLimitRepository: Repository {
    /// Fetch the current window for a key
    async fn fetch(&self, key: &str) -> Result<Option<RateWindow>, DatabaseError>;

    /// Insert a fresh window with count 1. Returns false when a concurrent
    /// insert won the race on the unique key; the loser's request is still
    /// admitted, over-admitting the window by at most one.
    async fn create_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Reset an elapsed window to count 1 with a new start
    async fn reset_window(&self, key: &str, window_start: DateTime<Utc>) -> Result<(), DatabaseError>;

    /// Atomically add one request to the key's window
    async fn increment(&self, key: &str) -> Result<(), DatabaseError>;
}

// =============================================================================
// Repository Factory
// =============================================================================

/// Factory trait for creating repository instances
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Get user repository instance
    fn user_repository(&self) -> &dyn UserRepository;

    /// Get organization repository instance
    fn organization_repository(&self) -> &dyn OrganizationRepository;

    /// Get role repository instance
    fn role_repository(&self) -> &dyn RoleRepository;

    /// Get permission repository instance
    fn permission_repository(&self) -> &dyn PermissionRepository;

    /// Get refresh token repository instance
    fn refresh_token_repository(&self) -> &dyn RefreshTokenRepository;

    /// Get password reset token repository instance
    fn password_reset_token_repository(&self) -> &dyn PasswordResetTokenRepository;

    /// Get API key repository instance
    fn api_key_repository(&self) -> &dyn ApiKeyRepository;

    /// Get rate limit repository instance
    fn rate_limit_repository(&self) -> &dyn RateLimitRepository;

    /// Check health of all repositories
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
