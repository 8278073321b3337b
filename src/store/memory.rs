//! In-memory document store.
//!
//! Implements the same merge-upsert and create-if-absent semantics as the
//! PostgreSQL store. Used when no `DATABASE_URL` is configured and as the
//! backing store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, Fields};
use crate::error::StoreError;

type DocumentKey = (String, String);

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentKey, Fields>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryDocumentStore {
    /// Snapshot of a single document.
    pub async fn get(&self, collection: &str, key: &str) -> Option<Fields> {
        self.documents
            .read()
            .await
            .get(&(collection.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Number of write calls that reached the store, including no-op creates.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn merge_upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut documents = self.documents.write().await;
        documents
            .entry((collection.to_string(), key.to_string()))
            .or_default()
            .extend(fields);

        Ok(())
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut documents = self.documents.write().await;
        let doc_key = (collection.to_string(), key.to_string());
        if documents.contains_key(&doc_key) {
            return Ok(false);
        }

        documents.insert(doc_key, fields);
        Ok(true)
    }
}
