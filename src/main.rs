//! Credential Provisioning Service - Main Application Entry Point
//!
//! An HTTP service that accepts a caller's API key, stores only a salted
//! PBKDF2 hash of it against the caller's verified identity, and creates the
//! caller's empty chat log and warning log documents.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: document store over PostgreSQL (sqlx), or in-memory when no database is configured
//! - **Identity**: HMAC-signed assertions from the upstream identity provider
//! - **Hashing**: PBKDF2-HMAC-SHA512 with a per-call random salt
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Construct the document store (and run migrations for PostgreSQL)
//! 3. Build the provisioning service and HTTP router
//! 4. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    middleware::auth::IdentityVerifier,
    services::provisioning::CredentialProvisioner,
    state::AppState,
    store::{MemoryDocumentStore, PostgresDocumentStore, SharedStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let store = build_store(&config).await?;

    let provisioner = CredentialProvisioner::new(
        store.clone(),
        config.hashing_params(),
        config.retry_config(),
        config.store_timeout(),
    );

    let state = AppState {
        store,
        provisioner: Arc::new(provisioner),
        identity: IdentityVerifier::new(config.identity_secret.as_bytes()),
        store_timeout: config.store_timeout(),
    };

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the document store selected by configuration.
async fn build_store(config: &config::Config) -> anyhow::Result<SharedStore> {
    match &config.database_url {
        Some(database_url) => {
            let pool =
                db::create_pool(database_url, config.db_max_connections, config.store_timeout())
                    .await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Ok(Arc::new(PostgresDocumentStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory document store; data will not persist");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}
