//! Error types for authentication operations

use chrono::{DateTime, Utc};
use thiserror::Error;
use vigil_interfaces::DatabaseError;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors surfaced by the credential, token, API key and rate limit services
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Wrong email or wrong password; the message never says which.
    /// `attempts_remaining` is populated only after a counted failure.
    #[error("Invalid email or password")]
    InvalidCredentials { attempts_remaining: Option<i32> },

    #[error("Account is locked until {unlock_at}")]
    AccountLocked { unlock_at: DateTime<Utc> },

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid or unknown token")]
    TokenInvalid,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key has expired")]
    ApiKeyExpired,

    #[error("{message}")]
    DuplicateResource { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i32 },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: i32 },

    #[error("API key not found: {key_id}")]
    ApiKeyNotFound { key_id: i32 },

    #[error("Internal authentication error: {message}")]
    Internal { message: String },
}

impl AuthError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a duplicate-resource error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateResource {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Generic invalid-credentials error that reveals nothing beyond itself
    pub fn invalid_credentials() -> Self {
        Self::InvalidCredentials {
            attempts_remaining: None,
        }
    }

    /// Whether this error denies authentication (as opposed to authorization
    /// or validation)
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials { .. }
                | Self::AccountLocked { .. }
                | Self::TokenExpired
                | Self::TokenInvalid
                | Self::InvalidApiKey
                | Self::ApiKeyExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message_hides_the_counter() {
        let err = AuthError::InvalidCredentials {
            attempts_remaining: Some(2),
        };
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[test]
    fn test_account_locked_includes_unlock_time() {
        let unlock_at = Utc::now();
        let err = AuthError::AccountLocked { unlock_at };
        assert!(err.to_string().contains(&unlock_at.to_string()));
    }

    #[test]
    fn test_authentication_failure_predicate() {
        assert!(AuthError::TokenExpired.is_authentication_failure());
        assert!(AuthError::invalid_credentials().is_authentication_failure());
        assert!(!AuthError::validation("bad input").is_authentication_failure());
        assert!(!AuthError::UserNotFound { user_id: 1 }.is_authentication_failure());
    }
}
