//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, request extensions)
//! 2. Delegates to the provisioning service
//! 3. Returns HTTP response (JSON, status code)

/// Credential provisioning endpoint
pub mod credentials;
/// Health check endpoint
pub mod health;
