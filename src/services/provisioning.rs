//! Credential provisioning - the core of the service.
//!
//! This service handles:
//! - Identity and input validation
//! - Salt generation and key derivation
//! - Persisting the credential record
//! - Creating the per-user log placeholders
//!
//! # Write Semantics
//!
//! The three writes are independent, each atomic per document and each safe
//! to repeat. A failure part way through leaves partial state that a repeated
//! call completes.

use std::future::Future;
use std::time::Duration;

use tracing::Instrument;

use crate::{
    error::{AppError, StoreError},
    middleware::auth::CallerIdentity,
    models::credential::{CredentialRecord, ProvisionResponse},
    services::{
        hashing::{self, HashingParams},
        retry::{self, RetryConfig},
    },
    store::{
        self, CHAT_LOGS_COLLECTION, Fields, SharedStore, USERS_COLLECTION, WARN_LOGS_COLLECTION,
    },
};

/// Hashes API keys and stores them against the caller's identity.
///
/// Holds no per-call state; one instance serves all requests concurrently.
pub struct CredentialProvisioner {
    store: SharedStore,
    hashing: HashingParams,
    retry: RetryConfig,
    store_timeout: Duration,
}

impl CredentialProvisioner {
    pub fn new(
        store: SharedStore,
        hashing: HashingParams,
        retry: RetryConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            hashing,
            retry,
            store_timeout,
        }
    }

    /// Provision a credential for the caller.
    ///
    /// # Process
    ///
    /// 1. Reject if no verified caller identity is attached
    /// 2. Reject if the secret is missing or empty
    /// 3. Generate a fresh salt and derive the hash
    /// 4. Merge `{hashed_api, salt}` into the caller's user document
    /// 5. Create the chat log and warning log placeholders if absent
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: `caller` is `None`
    /// - `InvalidArgument`: `secret` is `None` or empty
    /// - `Store`: a write still failed after the retry policy was exhausted
    ///
    /// Validation failures happen before any write.
    pub async fn provision(
        &self,
        caller: Option<&CallerIdentity>,
        secret: Option<&str>,
    ) -> Result<ProvisionResponse, AppError> {
        let caller = caller.ok_or(AppError::Unauthenticated)?;

        let secret = match secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                return Err(AppError::InvalidArgument(
                    "API key is required.".to_string(),
                ));
            }
        };

        let user_id = caller.user_id();
        let span = tracing::info_span!("provision_credential", user_id = %user_id);

        async move {
            let record = self.derive_record(secret).await?;
            let fields = record.to_fields()?;
            tracing::debug!("credential derived");

            self.with_retry(|| {
                self.store
                    .merge_upsert(USERS_COLLECTION, user_id, fields.clone())
            })
            .await?;
            tracing::debug!("credential record stored");

            for collection in [CHAT_LOGS_COLLECTION, WARN_LOGS_COLLECTION] {
                let created = self
                    .with_retry(|| self.store.create_if_absent(collection, user_id, Fields::new()))
                    .await?;
                tracing::debug!(collection, created, "log placeholder ensured");
            }

            tracing::info!("API key provisioned");
            Ok(ProvisionResponse::stored())
        }
        .instrument(span)
        .await
    }

    /// Generate a salt and hash the secret off the async runtime.
    async fn derive_record(&self, secret: &str) -> Result<CredentialRecord, AppError> {
        let secret = secret.to_owned();
        let params = self.hashing;

        tokio::task::spawn_blocking(move || {
            let salt = hashing::generate_salt();
            let hashed_api = hashing::derive_hash(&secret, &salt, &params);
            CredentialRecord { hashed_api, salt }
        })
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))
    }

    /// Run a store call under the per-call timeout and the retry policy.
    async fn with_retry<F, Fut, T>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let timeout = self.store_timeout;
        retry::retry(&self.retry, || store::with_timeout(timeout, op())).await
    }
}
