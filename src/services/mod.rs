//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle validation, key derivation, and document store writes.

pub mod hashing;
pub mod provisioning;
pub mod retry;
