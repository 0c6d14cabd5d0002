use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use easyweb_core::error::CoreError;
use easyweb_db::StoreError;
use serde_json::json;

/// Internal message behind a 500, attached to the response as an extension.
/// The body never carries it; [`crate::middleware::error_detail`] copies it
/// into a `detail` field when the server config allows.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Application-level error type for HTTP handlers and gateway operations.
///
/// Wraps [`CoreError`] for domain errors and adds store and HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `easyweb_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure in the backing store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::Validation(errors.to_string()))
    }
}

pub const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    /// Message safe to hand back to the caller over the gateway.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Core(CoreError::NotFound { entity, .. }) => format!("{entity} not found"),
            AppError::Core(CoreError::Validation(msg))
            | AppError::Core(CoreError::Conflict(msg))
            | AppError::Core(CoreError::Unauthorized(msg))
            | AppError::Core(CoreError::Forbidden(msg))
            | AppError::BadRequest(msg) => msg.clone(),
            AppError::Core(CoreError::Internal(_))
            | AppError::Store(_)
            | AppError::InternalError(_) => "Server error".to_string(),
        }
    }

    fn classify(&self) -> (StatusCode, &'static str, String, Option<String>) {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
                }
                CoreError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None)
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal(msg.clone())
                }
            },

            AppError::Store(StoreError::Database(sqlx::Error::RowNotFound)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
                None,
            ),
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                internal(err.to_string())
            }

            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal(msg.clone())
            }
        }
    }
}

fn internal(detail: String) -> (StatusCode, &'static str, String, Option<String>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
        Some(detail),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = self.classify();

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}
