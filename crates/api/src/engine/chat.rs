//! Chat persistence and room broadcast.
//!
//! Used by both the gateway and `POST /chats/{project_id}` so a message is
//! stored and broadcast the same way whichever surface accepted it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use easyweb_core::chat::{ChatFile, MessageType};
use easyweb_core::error::CoreError;
use easyweb_core::lifecycle::{check_view, Identity};
use easyweb_core::protocol::{server_events, ServerFrame};
use easyweb_core::roles::{ParticipantKind, Role};
use easyweb_core::rooms::Room;
use easyweb_core::types::DbId;
use easyweb_db::models::chat_message::{ChatMessage, ChatMessageView, NewChatMessage};
use easyweb_db::models::project::Project;
use easyweb_db::Stores;

use crate::error::{AppError, AppResult};
use crate::ws::RoomHub;

/// Who is sending, as resolved by the accepting surface.
#[derive(Debug, Clone, Copy)]
pub struct ChatSender {
    pub id: DbId,
    pub kind: ParticipantKind,
    /// Role of the bound identity, if the sender is authenticated.
    pub role: Option<Role>,
}

/// Message content after surface-specific parsing.
#[derive(Debug, Clone, Default)]
pub struct OutgoingChat {
    pub to: Option<DbId>,
    pub to_kind: Option<ParticipantKind>,
    pub text: String,
    pub files: Vec<ChatFile>,
    pub message_type: MessageType,
}

type RoomLock = Arc<tokio::sync::Mutex<()>>;

pub struct ChatService {
    stores: Stores,
    hub: Arc<RoomHub>,
    room_locks: Mutex<HashMap<DbId, RoomLock>>,
}

impl ChatService {
    pub fn new(stores: Stores, hub: Arc<RoomHub>) -> Self {
        Self {
            stores,
            hub,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    fn room_lock(&self, project_id: DbId) -> AppResult<RoomLock> {
        let mut locks = self
            .room_locks
            .lock()
            .map_err(|_| AppError::InternalError("chat room locks poisoned".into()))?;
        Ok(locks.entry(project_id).or_default().clone())
    }

    /// Drop the room's lock entry once no send holds or awaits it.
    fn release_room_lock(&self, project_id: DbId) {
        if let Ok(mut locks) = self.room_locks.lock() {
            if locks
                .get(&project_id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&project_id);
            }
        }
    }

    /// Persist, hydrate, and broadcast one message to the project room.
    ///
    /// The per-room lock is held across all three steps, so members of a
    /// room see messages in the order they were persisted.
    pub async fn send(
        &self,
        project: &Project,
        sender: ChatSender,
        outgoing: OutgoingChat,
    ) -> AppResult<ChatMessageView> {
        easyweb_core::lifecycle::check_post_chat(&project.access(), sender.id, sender.role)?;

        let input = NewChatMessage {
            project_id: project.id,
            from_id: sender.id,
            from_kind: sender.kind,
            to_id: outgoing.to,
            to_kind: outgoing
                .to
                .map(|_| outgoing.to_kind.unwrap_or(sender.kind.counterpart())),
            text: outgoing.text,
            files: outgoing.files,
            message_type: outgoing.message_type,
        };

        let lock = self.room_lock(project.id)?;
        let result = {
            let _guard = lock.lock().await;
            self.persist_and_broadcast(&input).await
        };
        drop(lock);
        self.release_room_lock(project.id);
        result
    }

    async fn persist_and_broadcast(&self, input: &NewChatMessage) -> AppResult<ChatMessageView> {
        let message = self.stores.chats.insert(input).await?;
        let view = self.hydrate(message).await;

        let frame = ServerFrame::new(
            server_events::CHAT_MESSAGE,
            serde_json::to_value(&view)
                .map_err(|e| AppError::InternalError(format!("encode chat message: {e}")))?,
        );
        let delivered = self.hub.send_to_room(Room::Project(view.project_id), &frame).await;
        tracing::info!(
            project_id = %view.project_id,
            message_id = %view.id,
            delivered,
            "Chat message saved and broadcast"
        );
        Ok(view)
    }

    /// Attach sender/recipient display data. Missing directory data leaves
    /// names empty rather than failing the send.
    pub async fn hydrate(&self, message: ChatMessage) -> ChatMessageView {
        let mut ids = vec![message.from_id];
        ids.extend(message.to_id);
        let directory = match self.stores.users.find_many(&ids).await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, message_id = %message.id, "Failed to load chat display data");
                Vec::new()
            }
        };
        ChatMessageView::hydrate(message, &directory)
    }

    /// Project history in send order, minus what `identity` hid.
    pub async fn history(
        &self,
        identity: &Identity,
        project: &Project,
    ) -> AppResult<Vec<ChatMessageView>> {
        check_view(&project.access(), identity)?;
        let messages = self.stores.chats.history(project.id, identity.user_id).await?;

        let mut ids: Vec<DbId> = messages
            .iter()
            .flat_map(|m| std::iter::once(m.from_id).chain(m.to_id))
            .collect();
        ids.sort();
        ids.dedup();
        let directory = self.stores.users.find_many(&ids).await?;

        Ok(messages
            .into_iter()
            .map(|m| ChatMessageView::hydrate(m, &directory))
            .collect())
    }
}

/// REST sends carry text or at least one file.
pub fn require_content(text: &str, files: &[ChatFile]) -> Result<(), CoreError> {
    if text.trim().is_empty() && files.is_empty() {
        return Err(CoreError::Validation("Text or files are required".into()));
    }
    Ok(())
}
