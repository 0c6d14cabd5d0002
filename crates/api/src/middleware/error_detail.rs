//! Development aid: surfaces the internal message of a 500 response.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{ErrorDetail, INTERNAL_MESSAGE};
use crate::state::AppState;

/// Rebuild the body of an internal error with its `detail` when
/// `ServerConfig::expose_error_detail` is set. Other responses pass through.
pub async fn expose_error_detail(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.config.expose_error_detail {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let body = json!({
        "error": INTERNAL_MESSAGE,
        "code": "INTERNAL_ERROR",
        "detail": detail,
    });
    (response.status(), Json(body)).into_response()
}
