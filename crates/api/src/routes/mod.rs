pub mod chat;
pub mod health;
pub mod project;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                   WebSocket gateway
///
/// /projects                             list, create
/// /projects/open                        open feed (developer)
/// /projects/count                       owned count
/// /projects/{id}                        get, update, delete
/// /projects/{id}/accept                 accept (PUT)
/// /projects/{id}/timeline               get, post update (PUT)
/// /projects/{id}/request-delete         request deletion (POST)
/// /projects/{id}/approve-delete         approve deletion (POST)
///
/// /chats/{project_id}                   history, send
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/projects", project::router())
        .nest("/chats", chat::router())
}
