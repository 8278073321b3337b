//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.

/// Caller identity resolution middleware
pub mod auth;
