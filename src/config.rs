//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::services::{hashing::HashingParams, retry::RetryConfig};

/// Lowest PBKDF2 iteration count the service accepts.
pub const MIN_PBKDF2_ITERATIONS: u32 = 1000;

/// Minimum length in bytes of the identity assertion signing secret.
const MIN_IDENTITY_SECRET_LEN: usize = 32;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is missing or cannot be parsed into its expected type.
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    /// A variable parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (optional): PostgreSQL connection string; the in-memory store is used when unset
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `IDENTITY_SECRET` (required): HMAC key used to verify caller identity assertions
/// - `PBKDF2_ITERATIONS` (optional): key derivation rounds, defaults to 1000
/// - `STORE_TIMEOUT_MS` (optional): per-call document store timeout, defaults to 3000
/// - `STORE_RETRY_ATTEMPTS` (optional): attempts per store write, defaults to 3
/// - `STORE_RETRY_BASE_DELAY_MS` (optional): first backoff delay, defaults to 100
/// - `DB_MAX_CONNECTIONS` (optional): Postgres pool size, defaults to 5
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub identity_secret: String,

    /// Raising this breaks verification of hashes stored under the old count
    /// unless the count is stored alongside each record.
    #[serde(default = "default_iterations")]
    pub pbkdf2_iterations: u32,

    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    #[serde(default = "default_retry_attempts")]
    pub store_retry_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub store_retry_base_delay_ms: u64,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_iterations() -> u32 {
    MIN_PBKDF2_ITERATIONS
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_max_connections() -> u32 {
    5
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("server_port", &self.server_port)
            .field("identity_secret", &"<redacted>")
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("store_retry_attempts", &self.store_retry_attempts)
            .field("store_retry_base_delay_ms", &self.store_retry_base_delay_ms)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., IDENTITY_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    /// - Values are outside their accepted ranges
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: identity_secret -> IDENTITY_SECRET
        Self::from_pairs(std::env::vars())
    }

    /// Build configuration from explicit key/value pairs.
    ///
    /// Same rules as [`Config::from_env`] without touching the process environment.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(pairs)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.identity_secret.len() < MIN_IDENTITY_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "IDENTITY_SECRET must be at least {MIN_IDENTITY_SECRET_LEN} bytes"
            )));
        }

        if self.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(ConfigError::Invalid(format!(
                "PBKDF2_ITERATIONS must be at least {MIN_PBKDF2_ITERATIONS}"
            )));
        }

        if self.store_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "STORE_RETRY_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "STORE_TIMEOUT_MS must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn hashing_params(&self) -> HashingParams {
        HashingParams {
            iterations: self.pbkdf2_iterations,
            ..HashingParams::default()
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.store_retry_attempts,
            base_delay: Duration::from_millis(self.store_retry_base_delay_ms),
            ..RetryConfig::default()
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
