//! Credential record and provisioning request/response types.
//!
//! This module defines:
//! - `CredentialRecord`: the hashed key and salt stored per user
//! - `ProvisionRequest`: request body carrying the plaintext API key
//! - `ProvisionResponse`: response body returned to clients

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::AppError, store::Fields};

/// Hashed API key stored in the `Users` collection under the caller's id.
///
/// # Stored Fields
///
/// - `hashed_api`: PBKDF2-HMAC-SHA512 output (128 hex characters)
/// - `salt`: random salt used for the derivation (32 hex characters)
///
/// The record is merged into the user document, so unrelated fields on it survive.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRecord {
    pub hashed_api: String,
    pub salt: String,
}

impl CredentialRecord {
    /// Field set written by the merge-upsert.
    pub fn to_fields(&self) -> Result<Fields, AppError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(AppError::Internal(
                "credential record did not serialize to an object".to_string(),
            )),
            Err(e) => Err(AppError::Internal(format!(
                "failed to serialize credential record: {e}"
            ))),
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("hashed_api", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

/// Request body for provisioning a credential.
///
/// # JSON Example
///
/// ```json
/// {
///   "apiKey": "sk_live_abc"
/// }
/// ```
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequest {
    /// Plaintext API key. Never logged or stored.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Response body for a successful provisioning call.
///
/// Never carries the secret, the hash, or the salt.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "message": "API key hashed and stored successfully"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionResponse {
    pub success: bool,
    pub message: String,
}

impl ProvisionResponse {
    pub fn stored() -> Self {
        Self {
            success: true,
            message: "API key hashed and stored successfully".to_string(),
        }
    }
}
