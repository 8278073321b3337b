//! Caller identity middleware.
//!
//! Identity is established upstream by the identity provider, which issues a
//! signed assertion for each user. This middleware only verifies it:
//! 1. Extract the assertion from the Authorization header
//! 2. Verify its HMAC-SHA256 signature in constant time
//! 3. Inject the verified `CallerIdentity` into the request
//!
//! Requests without a valid assertion pass through with no identity attached;
//! the provisioning service rejects them as unauthenticated.
//!
//! # Assertion Format
//!
//! ```text
//! Authorization: Bearer <user_id>.<hex HMAC-SHA256(identity_secret, user_id)>
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Verified identity of the caller.
///
/// Only ever constructed from a verified assertion, never from request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    user_id: String,
}

impl CallerIdentity {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[cfg(test)]
    pub fn for_test(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
        }
    }
}

/// Signs and verifies identity assertions with a shared secret.
#[derive(Clone)]
pub struct IdentityVerifier {
    secret: Arc<[u8]>,
}

impl IdentityVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key length is valid")
    }

    /// Issue an assertion for `user_id`, as the identity provider does.
    #[cfg(test)]
    pub fn sign(&self, user_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        format!("{}.{}", user_id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify an assertion and return the identity it names.
    ///
    /// Returns `None` for malformed assertions, empty user ids, and bad signatures.
    pub fn verify(&self, assertion: &str) -> Option<CallerIdentity> {
        let (user_id, signature) = assertion.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }

        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(user_id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(CallerIdentity {
            user_id: user_id.to_string(),
        })
    }
}

impl std::fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityVerifier").finish_non_exhaustive()
    }
}

/// Identity resolution middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <assertion>` header from request
/// 2. Verify the assertion signature
/// 3. If valid: inject `CallerIdentity` into request extensions
/// 4. Call the next handler either way
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let assertion = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    if let Some(assertion) = assertion {
        match state.identity.verify(assertion) {
            Some(identity) => {
                request.extensions_mut().insert(identity);
            }
            None => tracing::debug!("rejected invalid identity assertion"),
        }
    }

    next.run(request).await
}
