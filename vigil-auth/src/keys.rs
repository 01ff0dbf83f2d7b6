//! API key issuance and validation
//!
//! Keys are opaque bearer secrets of the form `sk_<8 hex>_<32 hex>`, where
//! the first group is the owning organization's id in hex. The store keeps
//! only the SHA-256 of the full plaintext; the plaintext crosses the wire
//! exactly once, in the issuance response.
//!
//! The permission set on a key is a snapshot taken at issuance. Later role
//! changes do not touch it; expiry and revocation are the only ways a key
//! stops working.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vigil_api_types::UnifiedApiKey;
use vigil_interfaces::{AuditEvent, AuditSink, NewApiKey, RepositoryFactory};
use vigil_rbac::PermissionSet;

use crate::error::{AuthError, AuthResult};
use crate::secrets::{generate_secret_hex, sha256_hex};

/// Identity resolved from a presented API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyIdentity {
    pub key_id: i32,
    pub user_id: i32,
    pub organization_id: i32,
    pub permissions: PermissionSet,
}

/// Issuance result. `api_key` is the plaintext secret, returned exactly once.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub api_key: String,
    pub key: UnifiedApiKey,
}

/// API key service
#[derive(Clone)]
pub struct ApiKeyService {
    repositories: Arc<dyn RepositoryFactory>,
    audit: Arc<dyn AuditSink>,
}

impl ApiKeyService {
    /// Create a new API key service
    pub fn new(repositories: Arc<dyn RepositoryFactory>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repositories, audit }
    }

    /// Issue a key for a user with a frozen permission snapshot.
    ///
    /// Every requested permission name must exist in the catalog.
    pub async fn issue(
        &self,
        name: &str,
        user_id: i32,
        organization_id: i32,
        scoped_permissions: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
        client_ip: Option<&str>,
    ) -> AuthResult<IssuedApiKey> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::validation("API key name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(AuthError::validation("API key name cannot exceed 100 characters"));
        }
        if let Some(at) = expires_at {
            if at <= Utc::now() {
                return Err(AuthError::validation("API key expiry must be in the future"));
            }
        }
        let requested: BTreeSet<String> = scoped_permissions.into_iter().collect();
        if requested.is_empty() {
            return Err(AuthError::validation("API key must carry at least one permission"));
        }
        let requested: Vec<String> = requested.into_iter().collect();
        let known = self
            .repositories
            .permission_repository()
            .find_by_names(&requested)
            .await?;
        if known.len() != requested.len() {
            let known: BTreeSet<&str> = known.iter().map(|p| p.name.as_str()).collect();
            let unknown: Vec<&str> = requested
                .iter()
                .map(String::as_str)
                .filter(|n| !known.contains(n))
                .collect();
            return Err(AuthError::validation(format!(
                "Unknown permissions: {}",
                unknown.join(", ")
            )));
        }

        let secret = generate_secret_hex::<16>();
        let api_key = format!("sk_{organization_id:08x}_{secret}");
        let key_prefix = format!("sk_{organization_id:08x}_{}", &secret[..4]);

        let key = self
            .repositories
            .api_key_repository()
            .create(NewApiKey {
                name: name.to_string(),
                key_hash: sha256_hex(&api_key),
                key_prefix,
                user_id,
                organization_id,
                scoped_permissions: requested,
                expires_at,
            })
            .await?;

        info!(user_id, key = %key.key_prefix, "api key issued");
        let mut event = AuditEvent::new("apikey.issue", "api_key")
            .with_user(user_id)
            .with_resource_id(key.id.as_str())
            .with_detail("name", key.name.clone());
        if let Some(ip) = client_ip {
            event = event.with_ip(ip);
        }
        self.audit.record(event);

        Ok(IssuedApiKey { api_key, key })
    }

    /// Resolve the identity behind a presented key.
    ///
    /// Absent and expired keys fail distinctly. The `last_used_at` stamp is
    /// best-effort: a failure there is logged and the validation still
    /// succeeds.
    pub async fn validate(&self, api_key: &str) -> AuthResult<ApiKeyIdentity> {
        let repo = self.repositories.api_key_repository();
        let key = repo
            .find_by_hash(&sha256_hex(api_key))
            .await?
            .ok_or(AuthError::InvalidApiKey)?;

        if let Some(expires_at) = key.expires_at {
            if expires_at <= Utc::now() {
                return Err(AuthError::ApiKeyExpired);
            }
        }

        let (Some(key_id), Some(user_id), Some(organization_id)) =
            (key.id.as_i32(), key.user_id.as_i32(), key.organization_id.as_i32())
        else {
            warn!(key = %key.key_prefix, "api key row carries non-numeric ids");
            return Err(AuthError::InvalidApiKey);
        };

        if let Err(e) = repo.touch_last_used(key_id).await {
            warn!(key_id, error = %e, "failed to stamp api key last_used_at");
        }

        Ok(ApiKeyIdentity {
            key_id,
            user_id,
            organization_id,
            permissions: PermissionSet::from_names(key.scoped_permissions),
        })
    }

    /// List a user's keys, metadata only
    pub async fn list(&self, user_id: i32) -> AuthResult<Vec<UnifiedApiKey>> {
        Ok(self.repositories.api_key_repository().list_for_user(user_id).await?)
    }

    /// Hard-delete a key regardless of owner
    pub async fn revoke(&self, key_id: i32) -> AuthResult<()> {
        if self.repositories.api_key_repository().delete(key_id).await? == 0 {
            return Err(AuthError::ApiKeyNotFound { key_id });
        }
        info!(key_id, "api key revoked");
        self.audit
            .record(AuditEvent::new("apikey.revoke", "api_key").with_resource_id(key_id.to_string()));
        Ok(())
    }

    /// Delete a key the caller owns. The owner check lives in the delete
    /// predicate, so a foreign key id reads as not found.
    pub async fn revoke_owned(&self, user_id: i32, key_id: i32, client_ip: Option<&str>) -> AuthResult<()> {
        let deleted = self
            .repositories
            .api_key_repository()
            .delete_for_user(key_id, user_id)
            .await?;
        if deleted == 0 {
            return Err(AuthError::ApiKeyNotFound { key_id });
        }

        info!(user_id, key_id, "api key revoked");
        let mut event = AuditEvent::new("apikey.revoke", "api_key")
            .with_user(user_id)
            .with_resource_id(key_id.to_string());
        if let Some(ip) = client_ip {
            event = event.with_ip(ip);
        }
        self.audit.record(event);
        Ok(())
    }
}
