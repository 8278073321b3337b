//! Data models for stored records and API payloads.

/// Credential record and provisioning request/response types
pub mod credential;
