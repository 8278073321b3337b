//! Shared application state handed to handlers and middleware.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    middleware::auth::IdentityVerifier, services::provisioning::CredentialProvisioner,
    store::SharedStore,
};

/// Dependencies constructed once at startup and cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub provisioner: Arc<CredentialProvisioner>,
    pub identity: IdentityVerifier,
    /// Bound on any single store call made outside the provisioner.
    pub store_timeout: Duration,
}
