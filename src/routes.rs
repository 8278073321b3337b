//! HTTP router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// # Routes
///
/// - `GET /health` (public)
/// - `POST /api/v1/credentials` (identity resolved by middleware)
pub fn build_router(state: AppState) -> Router {
    let identified_routes = Router::new()
        .route(
            "/api/v1/credentials",
            post(handlers::credentials::provision_credential),
        )
        // Resolve caller identity for every route in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::identity_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(identified_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
