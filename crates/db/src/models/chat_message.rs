//! Chat message model and its hydrated wire view.

use easyweb_core::chat::{ChatFile, MessageType};
use easyweb_core::roles::ParticipantKind;
use easyweb_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::user::UserSummary;

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: DbId,
    pub project_id: DbId,
    pub from_id: DbId,
    pub from_kind: ParticipantKind,
    pub to_id: Option<DbId>,
    pub to_kind: Option<ParticipantKind>,
    pub text: String,
    pub files: Vec<ChatFile>,
    pub message_type: MessageType,
    pub sent_at: Timestamp,
    pub deleted_for: Vec<DbId>,
}

impl ChatMessage {
    pub fn is_hidden_for(&self, user_id: DbId) -> bool {
        self.deleted_for.contains(&user_id)
    }
}

/// Everything needed to persist a new message. The store assigns the id and
/// the timestamp.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub project_id: DbId,
    pub from_id: DbId,
    pub from_kind: ParticipantKind,
    pub to_id: Option<DbId>,
    pub to_kind: Option<ParticipantKind>,
    pub text: String,
    pub files: Vec<ChatFile>,
    pub message_type: MessageType,
}

/// Body of `POST /chats/{project_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendChatInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub files: Vec<ChatFile>,
}

/// Display data attached to a sender or recipient reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: DbId,
    pub kind: ParticipantKind,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Participant {
    /// Attach display data when the directory knows the subject.
    pub fn resolve(id: DbId, kind: ParticipantKind, directory: &[UserSummary]) -> Self {
        let known = directory.iter().find(|u| u.id == id);
        Self {
            id,
            kind,
            name: known.map(|u| u.name.clone()),
            email: known.and_then(|u| u.email.clone()),
        }
    }
}

/// A chat message with sender and recipient display data, as broadcast to
/// rooms and returned from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub id: DbId,
    pub project_id: DbId,
    pub from: Participant,
    pub to: Option<Participant>,
    pub text: String,
    pub files: Vec<ChatFile>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub timestamp: Timestamp,
    pub deleted_for: Vec<DbId>,
}

impl ChatMessageView {
    pub fn hydrate(message: ChatMessage, directory: &[UserSummary]) -> Self {
        let from = Participant::resolve(message.from_id, message.from_kind, directory);
        let to = match (message.to_id, message.to_kind) {
            (Some(id), Some(kind)) => Some(Participant::resolve(id, kind, directory)),
            (Some(id), None) => Some(Participant::resolve(id, message.from_kind.counterpart(), directory)),
            _ => None,
        };
        Self {
            id: message.id,
            project_id: message.project_id,
            from,
            to,
            text: message.text,
            files: message.files,
            message_type: message.message_type,
            timestamp: message.sent_at,
            deleted_for: message.deleted_for,
        }
    }
}

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatRow {
    pub id: DbId,
    pub project_id: DbId,
    pub from_id: DbId,
    pub from_kind: String,
    pub to_id: Option<DbId>,
    pub to_kind: Option<String>,
    pub text: String,
    pub files: Json<Vec<ChatFile>>,
    pub message_type: String,
    pub sent_at: Timestamp,
    pub deleted_for: Vec<DbId>,
}

impl TryFrom<ChatRow> for ChatMessage {
    type Error = sqlx::Error;

    fn try_from(row: ChatRow) -> Result<Self, Self::Error> {
        let decode = |e: String| sqlx::Error::Decode(e.into());
        Ok(ChatMessage {
            id: row.id,
            project_id: row.project_id,
            from_id: row.from_id,
            from_kind: row.from_kind.parse().map_err(decode)?,
            to_id: row.to_id,
            to_kind: row
                .to_kind
                .map(|kind| kind.parse::<ParticipantKind>())
                .transpose()
                .map_err(decode)?,
            text: row.text,
            files: row.files.0,
            message_type: row.message_type.parse().map_err(decode)?,
            sent_at: row.sent_at,
            deleted_for: row.deleted_for,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: DbId, to: Option<DbId>) -> ChatMessage {
        ChatMessage {
            id: uuid::Uuid::new_v4(),
            project_id: uuid::Uuid::new_v4(),
            from_id: from,
            from_kind: ParticipantKind::Client,
            to_id: to,
            to_kind: None,
            text: "hello".into(),
            files: vec![],
            message_type: MessageType::User,
            sent_at: chrono::Utc::now(),
            deleted_for: vec![],
        }
    }

    #[test]
    fn hydrate_attaches_known_display_data() {
        let client = uuid::Uuid::new_v4();
        let directory = vec![UserSummary {
            id: client,
            name: "Ada".into(),
            email: Some("ada@example.com".into()),
            role: "client".into(),
        }];
        let view = ChatMessageView::hydrate(message(client, None), &directory);
        assert_eq!(view.from.name.as_deref(), Some("Ada"));
        assert!(view.to.is_none());
    }

    #[test]
    fn recipient_kind_defaults_to_counterpart() {
        let dev = uuid::Uuid::new_v4();
        let view = ChatMessageView::hydrate(message(uuid::Uuid::new_v4(), Some(dev)), &[]);
        let to = view.to.expect("recipient");
        assert_eq!(to.kind, ParticipantKind::Developer);
        assert_eq!(to.name, None);
    }

    #[test]
    fn view_serializes_absent_recipient_as_null() {
        let view = ChatMessageView::hydrate(message(uuid::Uuid::new_v4(), None), &[]);
        let value = serde_json::to_value(&view).unwrap();
        assert!(value["to"].is_null());
        assert_eq!(value["type"], "user");
        assert!(value["timestamp"].is_string());
    }
}
