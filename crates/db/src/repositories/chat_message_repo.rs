//! Repository for the `chat_messages` table.

use easyweb_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::chat_message::{ChatMessage, ChatRow, NewChatMessage};

const COLUMNS: &str = "\
    id, project_id, from_id, from_kind, to_id, to_kind, text, files, \
    message_type, sent_at, deleted_for";

/// Provides persistence for project chat messages.
pub struct ChatMessageRepo;

impl ChatMessageRepo {
    /// Persist a message. The timestamp is assigned by the database.
    pub async fn insert(
        pool: &PgPool,
        id: DbId,
        input: &NewChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages \
                (id, project_id, from_id, from_kind, to_id, to_kind, text, files, message_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatRow>(&query)
            .bind(id)
            .bind(input.project_id)
            .bind(input.from_id)
            .bind(input.from_kind.as_str())
            .bind(input.to_id)
            .bind(input.to_kind.map(|k| k.as_str()))
            .bind(&input.text)
            .bind(Json(&input.files))
            .bind(input.message_type.as_str())
            .fetch_one(pool)
            .await?
            .try_into()
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chat_messages WHERE id = $1");
        sqlx::query_as::<_, ChatRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(ChatMessage::try_from)
            .transpose()
    }

    /// Remove a message for everyone. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Add `user_id` to the message's deleted-for set. Adding an id that is
    /// already present leaves the set unchanged.
    pub async fn hide_for(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE chat_messages SET \
                deleted_for = CASE WHEN $2 = ANY(deleted_for) \
                                   THEN deleted_for \
                                   ELSE array_append(deleted_for, $2) END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .map(ChatMessage::try_from)
            .transpose()
    }

    /// All messages of a project in send order, excluding those `viewer`
    /// hid for themselves.
    pub async fn history(
        pool: &PgPool,
        project_id: DbId,
        viewer: DbId,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages \
             WHERE project_id = $1 AND NOT ($2 = ANY(deleted_for)) \
             ORDER BY sent_at ASC, seq ASC"
        );
        sqlx::query_as::<_, ChatRow>(&query)
            .bind(project_id)
            .bind(viewer)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(ChatMessage::try_from)
            .collect()
    }
}
