//! Error types and HTTP error response handling.
//!
//! This module defines the request-level error taxonomy and the storage-level
//! errors underneath it, and how both are converted into HTTP responses with
//! stable error codes and caller-safe messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Errors raised by a document store backend.
///
/// # Retry Classification
///
/// - `Timeout` and `Unavailable` are transient and eligible for a bounded retry
/// - `Backend` is fatal (constraint violations, bad data, programming errors)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store did not answer within the configured timeout.
    #[error("document store operation timed out")]
    Timeout,

    /// The store could not be reached or has no capacity right now.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation.
    #[error("document store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether a retry of the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Unavailable(_))
    }
}

/// SQLSTATE codes meaning the server cannot take the statement right now.
///
/// - `08xxx`: connection exception
/// - `53300`: too many connections
/// - `57P01` / `57P02` / `57P03`: shutting down, crashed, or not yet accepting connections
/// - `40001` / `40P01`: serialization failure, deadlock (the statement was rolled back)
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08")
        || matches!(code, "53300" | "57P01" | "57P02" | "57P03" | "40001" | "40P01")
}

/// Classify sqlx errors into transient and fatal store errors.
///
/// Connection-level failures (pool exhaustion, I/O, TLS, protocol breaks, a
/// closed pool) and database errors carrying a transient SQLSTATE are
/// retryable. Everything else is reported as a backend failure.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db)
                if db.code().as_deref().is_some_and(is_transient_sqlstate) =>
            {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Application-wide error type.
///
/// Every variant maps to a stable error code the caller can display or log.
///
/// # Error Categories
///
/// - **Unauthenticated**: no verified caller identity on the request
/// - **InvalidArgument**: missing, empty, or malformed secret
/// - **Store**: the document store failed after retries (reported as `internal`)
/// - **Internal**: any other unexpected failure (reported as `internal`)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No verified identity is attached to the request.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("User must be authenticated.")]
    Unauthenticated,

    /// The request input is invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String is the caller-safe description.
    #[error("{0}")]
    InvalidArgument(String),

    /// Document store failure that survived the retry policy.
    ///
    /// Returns HTTP 500 with a generic message; details stay in the server log.
    #[error("Document store failure: {0}")]
    Store(#[from] StoreError),

    /// Unexpected failure outside the store (e.g. a panicked hashing task).
    ///
    /// Returns HTTP 500 with a generic message.
    #[error("Internal failure: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code reported in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::InvalidArgument(_) => "invalid-argument",
            AppError::Store(_) | AppError::Internal(_) => "internal",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "invalid-argument",
///     "message": "API key is required."
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthenticated` → 401 Unauthorized
/// - `InvalidArgument` → 400 Bad Request
/// - `Store` / `Internal` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Store(_) | AppError::Internal(_) => {
                // Full detail is only ever logged server-side
                tracing::error!(error = %self, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::Timeout.is_transient());
        assert!(StoreError::Unavailable("connection refused".into()).is_transient());
        assert!(!StoreError::Backend("check constraint".into()).is_transient());
    }

    #[test]
    fn sqlx_pool_errors_are_transient() {
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_transient());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_transient());
    }

    #[derive(Debug)]
    struct PgError {
        code: &'static str,
    }

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "server error {}", self.code)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "server error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgError { code }))
    }

    #[test]
    fn unavailable_sqlstates_are_transient() {
        for code in ["53300", "57P01", "57P02", "57P03", "08006", "08001", "40001", "40P01"] {
            let err = StoreError::from(db_error(code));
            assert!(
                matches!(err, StoreError::Unavailable(_)),
                "{code} should be transient, got {err:?}"
            );
        }
    }

    #[test]
    fn constraint_sqlstates_are_fatal() {
        for code in ["23505", "23514", "42P01", "22P02"] {
            assert!(!StoreError::from(db_error(code)).is_transient(), "{code}");
        }
    }

    #[test]
    fn protocol_errors_are_transient() {
        assert!(StoreError::from(sqlx::Error::Protocol("unexpected message".into())).is_transient());
    }

    #[test]
    fn internal_errors_hide_store_detail() {
        let err = AppError::Store(StoreError::Backend("relation \"documents\" does not exist".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(AppError::InvalidArgument("x".into()).code(), "invalid-argument");
        assert_eq!(AppError::Store(StoreError::Timeout).code(), "internal");
        assert_eq!(AppError::Internal("join".into()).code(), "internal");
    }
}
