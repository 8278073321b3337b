//! Credential provisioning HTTP handler.
//!
//! - POST /api/v1/credentials - Hash and store the caller's API key

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    error::AppError,
    middleware::auth::CallerIdentity,
    models::credential::{ProvisionRequest, ProvisionResponse},
    state::AppState,
};

/// Hash and store an API key for the authenticated caller.
///
/// # Endpoint
///
/// `POST /api/v1/credentials`
///
/// # Authentication
///
/// Requires a verified identity assertion in the Authorization header.
///
/// # Request Body
///
/// ```json
/// {
///   "apiKey": "sk_live_abc"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"success": true, "message": "..."}`
/// - **Error (401)**: No verified caller identity
/// - **Error (400)**: `apiKey` missing, empty, or not a string, or the body is not JSON
/// - **Error (500)**: Document store failure after retries
///
/// Identity is checked before the body, so an unauthenticated caller never
/// learns why its body was rejected.
pub async fn provision_credential(
    State(state): State<AppState>,
    caller: Option<Extension<CallerIdentity>>,
    body: Result<Json<ProvisionRequest>, JsonRejection>,
) -> Result<Json<ProvisionResponse>, AppError> {
    let caller = caller.as_ref().map(|Extension(identity)| identity);

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable provisioning request body");
            if caller.is_none() {
                return Err(AppError::Unauthenticated);
            }
            return Err(AppError::InvalidArgument(rejection_message(&rejection).to_string()));
        }
    };

    let response = state
        .provisioner
        .provision(caller, request.api_key.as_deref())
        .await?;

    Ok(Json(response))
}

/// Caller-safe description of a body rejection.
///
/// Never echoes the body itself, which may carry the key.
fn rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Request body must be sent with Content-Type: application/json."
        }
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON.",
        JsonRejection::JsonDataError(_) => "Request body must be a JSON object with a string apiKey.",
        _ => "Request body could not be read.",
    }
}
