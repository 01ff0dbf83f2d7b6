//! API key endpoint request and response models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use vigil_api_types::UnifiedApiKey;

/// API key issuance request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    /// Permission names frozen onto the key at issuance
    pub permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Issuance response. `api_key` is the plaintext secret, shown exactly once.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedApiKeyResponse {
    pub api_key: String,
    pub key: UnifiedApiKey,
}
