//! Route definitions for the `/projects` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::project;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                        -> list
/// POST   /                        -> create
/// GET    /open                    -> list_open
/// GET    /count                   -> count
/// GET    /{id}                    -> get_by_id
/// PUT    /{id}                    -> update
/// DELETE /{id}                    -> delete
/// PUT    /{id}/accept             -> accept
/// GET    /{id}/timeline           -> timeline
/// PUT    /{id}/timeline           -> post_timeline
/// POST   /{id}/request-delete     -> request_deletion
/// POST   /{id}/approve-delete     -> approve_deletion
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/open", get(project::list_open))
        .route("/count", get(project::count))
        .route(
            "/{id}",
            get(project::get_by_id)
                .put(project::update)
                .delete(project::delete),
        )
        .route("/{id}/accept", put(project::accept))
        .route(
            "/{id}/timeline",
            get(project::timeline).put(project::post_timeline),
        )
        .route("/{id}/request-delete", post(project::request_deletion))
        .route("/{id}/approve-delete", post(project::approve_deletion))
}
