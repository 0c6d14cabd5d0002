//! Handlers for the `/chats` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use easyweb_core::types::parse_id;
use easyweb_db::models::chat_message::{ChatMessageView, SendChatInput};

use super::path_id;
use crate::engine::chat::require_content;
use crate::engine::{ChatSender, OutgoingChat};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/chats/{project_id}
///
/// History in send order, without the messages the caller hid.
pub async fn history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<ChatMessageView>>>> {
    let project = state.lifecycle.load(path_id(&project_id)?).await?;
    let messages = state.chat.history(&auth.identity(), &project).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/v1/chats/{project_id}
///
/// Persisted and broadcast to the project room exactly like a gateway send.
/// Without an explicit `to`, the message is stored unaddressed.
pub async fn send(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<SendChatInput>,
) -> AppResult<(StatusCode, Json<DataResponse<ChatMessageView>>)> {
    let project = state.lifecycle.load(path_id(&project_id)?).await?;

    let text = input.text.unwrap_or_default().trim().to_string();
    require_content(&text, &input.files)?;

    let to = match input.to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            parse_id(raw).ok_or_else(|| AppError::BadRequest("Invalid recipient id".into()))?,
        ),
        None => None,
    };

    let sender = ChatSender {
        id: auth.user_id,
        kind: auth.role.participant_kind(),
        role: Some(auth.role),
    };
    let outgoing = OutgoingChat {
        to,
        to_kind: None,
        text,
        files: input.files,
        message_type: input.message_type.unwrap_or_default(),
    };
    let message = state.chat.send(&project, sender, outgoing).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}
