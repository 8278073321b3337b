//! Document store abstraction.
//!
//! The provisioning core only needs two write primitives from its storage
//! backend, plus a reachability check for the health endpoint:
//! - `merge_upsert`: merge fields into a document, creating it if absent
//! - `create_if_absent`: create a document only when none exists at the key
//!
//! Documents are flat JSON objects addressed by `(collection, key)`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreError;

/// In-process store used by tests and local development
pub mod memory;
/// PostgreSQL-backed store
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

/// Field set of a single document.
pub type Fields = Map<String, Value>;

/// Shared handle to the store, constructed once at startup.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Collection holding one credential record per user.
pub const USERS_COLLECTION: &str = "Users";

/// Collection holding per-user chat log documents.
pub const CHAT_LOGS_COLLECTION: &str = "ChatLogs";

/// Collection holding per-user warning log documents.
pub const WARN_LOGS_COLLECTION: &str = "WarnLogs";

/// Storage contract the provisioning service depends on.
///
/// # Atomicity
///
/// Each call must be atomic at the single-document level. No guarantee is
/// made across documents or collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Merge `fields` into the document at `key`, creating it if absent.
    ///
    /// Top-level fields not named in `fields` are preserved.
    async fn merge_upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Create the document at `key` with `fields` unless one already exists.
    ///
    /// Returns `true` if a document was created, `false` if it already existed.
    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<bool, StoreError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Bound a single store call by `timeout`, reporting expiry as [`StoreError::Timeout`].
pub async fn with_timeout<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}
