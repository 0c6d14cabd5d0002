//! Route definitions for the `/chats` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chats`.
///
/// ```text
/// GET    /{project_id}    -> history
/// POST   /{project_id}    -> send
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{project_id}", get(chat::history).post(chat::send))
}
