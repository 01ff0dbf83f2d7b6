//! Permission resolution and membership checks

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vigil_interfaces::RepositoryFactory;

use crate::error::RbacResult;

/// A user's resolved permission names.
///
/// Ordered and deduplicated, so serializing one (for token claims or API
/// responses) is deterministic. Membership checks follow set conventions:
/// requiring nothing is vacuously satisfied, while "any of nothing" never is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// Build a set from permission names, deduplicating
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Check membership of a single permission
    pub fn has(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Check that every required permission is present.
    ///
    /// An empty requirement is satisfied by any set.
    pub fn has_all<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|p| self.has(p.as_ref()))
    }

    /// Check that at least one required permission is present.
    ///
    /// An empty requirement is never satisfied.
    pub fn has_any<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().any(|p| self.has(p.as_ref()))
    }

    /// Iterate names in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Consume into a sorted vector of names
    pub fn into_sorted_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for PermissionSet {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl FromIterator<String> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Permission checker resolving user permissions through their roles
#[derive(Clone)]
pub struct PermissionChecker {
    repositories: Arc<dyn RepositoryFactory>,
}

impl PermissionChecker {
    /// Create a new permission checker
    pub fn new(repositories: Arc<dyn RepositoryFactory>) -> Self {
        Self { repositories }
    }

    /// Resolve the distinct union of permission names reachable through the
    /// user's roles
    pub async fn permissions_for_user(&self, user_id: i32) -> RbacResult<PermissionSet> {
        let names = self
            .repositories
            .role_repository()
            .permission_names_for_user(user_id)
            .await?;
        Ok(PermissionSet::from_names(names))
    }

    /// Check if the user holds one permission
    pub async fn has_permission(&self, user_id: i32, permission: &str) -> RbacResult<bool> {
        Ok(self.permissions_for_user(user_id).await?.has(permission))
    }

    /// Check if the user holds every required permission
    pub async fn has_all_permissions(&self, user_id: i32, required: &[&str]) -> RbacResult<bool> {
        if required.is_empty() {
            return Ok(true);
        }
        Ok(self.permissions_for_user(user_id).await?.has_all(required))
    }

    /// Check if the user holds at least one required permission
    pub async fn has_any_permission(&self, user_id: i32, required: &[&str]) -> RbacResult<bool> {
        if required.is_empty() {
            return Ok(false);
        }
        Ok(self.permissions_for_user(user_id).await?.has_any(required))
    }
}
