//! Password hashing
//!
//! Thin wrapper over bcrypt pinned to cost 12. Salting is bcrypt's own;
//! hashing the same password twice yields different strings.

use crate::error::{AuthError, AuthResult};

/// Work factor used for stored credentials
pub const BCRYPT_COST: u32 = 12;

/// Password hasher with a fixed cost
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: BCRYPT_COST }
    }
}

impl PasswordHasher {
    /// Hasher at the production cost
    pub fn new() -> Self {
        Self::default()
    }

    /// Hasher at an explicit cost, clamped to bcrypt's supported 4..=31
    /// range. Test suites use a low cost to stay fast.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    /// Hash a plaintext password
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
    }

    /// Verify a plaintext password against a stored hash
    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        bcrypt::verify(password, hash).map_err(|e| AuthError::internal(format!("password verification failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::with_cost(4)
    }

    #[test]
    fn test_verify_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse battery staple").unwrap();

        assert!(hasher.verify("correct horse battery staple", &hash).unwrap());
        assert!(!hasher.verify("correct horse battery stapler", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("hunter2").unwrap();
        let second = hasher.hash("hunter2").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let err = hasher().verify("anything", "not-a-bcrypt-hash").unwrap_err();
        assert!(matches!(err, AuthError::Internal { .. }));
    }

    #[test]
    fn test_default_cost_is_pinned() {
        assert_eq!(PasswordHasher::new().cost, 12);
    }
}
