//! Access token issuance and validation
//!
//! Access tokens are HS256 JWTs carrying the caller's identity and resolved
//! authorization state. They are stateless: nothing about them is persisted,
//! and expiry is checked from the `exp` claim alone.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Signing configuration for access tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret. Startup validation requires at least 32 chars.
    pub signing_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_ttl: Duration,
}

impl TokenConfig {
    /// Config with the standard issuer/audience pair and 15-minute tokens
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer: "vigil".to_string(),
            audience: "vigil-api".to_string(),
            access_token_ttl: Duration::minutes(15),
        }
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: i32,
    pub email: String,
    pub organization_id: i32,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
}

/// JWT token manager
pub struct JwtManager {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// Create a new JWT manager
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.signing_secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.signing_secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Lifetime of issued access tokens
    pub fn access_token_ttl(&self) -> Duration {
        self.config.access_token_ttl
    }

    /// Sign an access token for an authenticated user
    pub fn generate_access_token(
        &self,
        user_id: i32,
        email: &str,
        organization_id: i32,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            user_id,
            email: email.to_string(),
            organization_id,
            roles,
            permissions,
            iat: now.timestamp(),
            exp: (now + self.config.access_token_ttl).timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign access token: {e}")))
    }

    /// Verify signature, expiry, issuer and audience.
    ///
    /// Expired and otherwise-invalid tokens fail distinctly so callers can
    /// tell clients whether a refresh would help.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        match decode::<AccessClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                _ => {
                    debug!(error = %e, "access token rejected");
                    Err(AuthError::TokenInvalid)
                }
            },
        }
    }
}
