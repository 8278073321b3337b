//! PostgreSQL document store.
//!
//! Documents live in a single `documents` table keyed by `(collection, doc_key)`
//! with their fields in a JSONB column. Both write primitives are single
//! `INSERT ... ON CONFLICT` statements, so each is atomic per document.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;

use super::{DocumentStore, Fields};
use crate::{db::DbPool, error::StoreError};

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: DbPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    /// Merge fields with JSONB concatenation.
    ///
    /// `||` keeps every top-level key of the stored document and overwrites
    /// only the keys present in the new fields.
    async fn merge_upsert(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, doc_key) DO UPDATE
            SET fields = documents.fields || EXCLUDED.fields,
                updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO documents (collection, doc_key, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, doc_key) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(Value::Object(fields)))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Needs a reachable PostgreSQL: DATABASE_URL=... cargo test -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn connect() -> Option<PostgresDocumentStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = crate::db::create_pool(&url, 2, std::time::Duration::from_secs(5))
            .await
            .expect("connect to DATABASE_URL");
        crate::db::run_migrations(&pool).await.expect("run migrations");
        Some(PostgresDocumentStore::new(pool))
    }

    fn unique_collection() -> String {
        format!("test-{}", hex::encode(rand::random::<[u8; 8]>()))
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    async fn fetch(store: &PostgresDocumentStore, collection: &str, key: &str) -> Option<Value> {
        sqlx::query_scalar::<_, Json<Value>>(
            "SELECT fields FROM documents WHERE collection = $1 AND doc_key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&store.pool)
        .await
        .unwrap()
        .map(|Json(value)| value)
    }

    #[tokio::test]
    #[ignore]
    async fn merge_upsert_keeps_unrelated_fields() {
        let Some(store) = connect().await else { return };
        let collection = unique_collection();

        store
            .merge_upsert(&collection, "u1", fields(json!({"nickname": "ada", "salt": "aa"})))
            .await
            .unwrap();
        store
            .merge_upsert(&collection, "u1", fields(json!({"salt": "bb", "hashed_api": "cc"})))
            .await
            .unwrap();

        assert_eq!(
            fetch(&store, &collection, "u1").await,
            Some(json!({"nickname": "ada", "salt": "bb", "hashed_api": "cc"}))
        );
    }

    #[tokio::test]
    #[ignore]
    async fn create_if_absent_does_not_overwrite() {
        let Some(store) = connect().await else { return };
        let collection = unique_collection();

        assert!(
            store
                .create_if_absent(&collection, "u1", fields(json!({"entries": 2})))
                .await
                .unwrap()
        );
        assert!(
            !store
                .create_if_absent(&collection, "u1", Fields::new())
                .await
                .unwrap()
        );

        assert_eq!(fetch(&store, &collection, "u1").await, Some(json!({"entries": 2})));
        store.ping().await.unwrap();
    }
}
