//! Event gateway: per-connection event dispatch.
//!
//! The socket task owns a [`ConnectionContext`] and feeds every inbound text
//! frame through [`Gateway::handle_text`]. All replies to the caller (errors,
//! acknowledgements, `joined`) go to that connection only; room traffic goes
//! through the [`RoomHub`].

use std::sync::Arc;

use axum::extract::ws::Message;
use easyweb_core::lifecycle::{can_delete_for_everyone, check_join_room, Identity};
use easyweb_core::protocol::{
    payload_project_id, server_events, AckReply, ChatPayload, ClientEvent, ClientFrame,
    DeleteForMeRequest, DeleteMessageRequest, PresenceUpdate, RoomRequest, ServerFrame,
};
use easyweb_core::roles::{ParticipantKind, Role};
use easyweb_core::rooms::{project_room, Room};
use easyweb_core::types::{parse_id, DbId};
use easyweb_db::models::chat_message::ChatMessageView;
use easyweb_db::models::project::Project;
use easyweb_db::Stores;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::engine::chat::{ChatSender, ChatService, OutgoingChat};
use crate::error::AppError;
use crate::ws::hub::{ConnId, RoomHub};

const SERVER_ERROR: &str = "Server error";

/// State of one live connection, owned by its socket task.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub conn_id: ConnId,
    /// Bound at connect time; `None` for unauthenticated connections.
    pub identity: Option<Identity>,
    /// The single project room this connection is currently in.
    pub active_project: Option<DbId>,
}

/// Result of one event: the ack body on success, the caller-facing reason
/// on failure.
type Outcome = Result<Value, String>;

pub struct Gateway {
    stores: Stores,
    hub: Arc<RoomHub>,
    chat: Arc<ChatService>,
}

impl Gateway {
    pub fn new(stores: Stores, hub: Arc<RoomHub>, chat: Arc<ChatService>) -> Self {
        Self { stores, hub, chat }
    }

    /// Register a connection. A bound identity joins its personal room, and
    /// developers also join the shared developers room.
    pub async fn connect(
        &self,
        identity: Option<Identity>,
    ) -> (ConnectionContext, mpsc::UnboundedReceiver<Message>) {
        let conn_id = uuid::Uuid::new_v4().to_string();
        let rx = self.hub.add(conn_id.clone()).await;

        if let Some(identity) = identity {
            self.hub.join(&conn_id, Room::Personal(identity.user_id)).await;
            if identity.role == Role::Developer {
                self.hub.join(&conn_id, Room::Developers).await;
            }
        }
        tracing::info!(
            conn_id = %conn_id,
            user_id = ?identity.map(|i| i.user_id),
            "Gateway connection registered"
        );

        let ctx = ConnectionContext {
            conn_id,
            identity,
            active_project: None,
        };
        (ctx, rx)
    }

    /// Drop the connection and tell every non-personal room it was in that
    /// the subject went offline.
    pub async fn disconnect(&self, ctx: ConnectionContext) {
        let rooms = self.hub.remove(&ctx.conn_id).await;
        if let Some(identity) = ctx.identity {
            for room in rooms.into_iter().filter(|room| !room.is_personal()) {
                self.presence(room, &identity, false).await;
            }
        }
        tracing::info!(conn_id = %ctx.conn_id, "Gateway connection closed");
    }

    /// Parse, decode, and dispatch one inbound text frame.
    pub async fn handle_text(&self, ctx: &mut ConnectionContext, text: &str) {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(conn_id = %ctx.conn_id, error = %e, "Rejected inbound frame");
                self.send_error(ctx, &e.to_string()).await;
                return;
            }
        };

        match ClientEvent::decode(&frame) {
            Ok(event) => self.dispatch(ctx, event, frame.ack).await,
            Err(e) => {
                tracing::debug!(conn_id = %ctx.conn_id, event = %frame.event, error = %e, "Rejected inbound event");
                let reason = e.to_string();
                self.send_error(ctx, &reason).await;
                if let Some(ack_id) = frame.ack {
                    self.send_ack(ctx, ack_id, AckReply::failure(reason)).await;
                }
            }
        }
    }

    pub async fn dispatch(&self, ctx: &mut ConnectionContext, event: ClientEvent, ack: Option<u64>) {
        let outcome = match event {
            ClientEvent::Join(req) => self.join(ctx, req).await,
            ClientEvent::Leave(req) => self.leave(ctx, req).await,
            ClientEvent::ChatMessage(payload) => self.send_chat(ctx, payload).await,
            ClientEvent::Typing(data) => self.relay(ctx, server_events::TYPING, data).await,
            ClientEvent::StopTyping(data) => {
                self.relay(ctx, server_events::STOP_TYPING, data).await
            }
            ClientEvent::Signal(kind, data) => self.relay(ctx, kind.event_name(), data).await,
            ClientEvent::ReadMessage(data) => self.read_receipt(ctx, data).await,
            ClientEvent::DeleteMessage(req) => self.delete_for_everyone(ctx, req).await,
            ClientEvent::DeleteMessageForMe(req) => self.delete_for_self(ctx, req).await,
        };

        if let Some(ack_id) = ack {
            let reply = match outcome {
                Ok(message) => AckReply::success(message),
                Err(reason) => AckReply::failure(reason),
            };
            self.send_ack(ctx, ack_id, reply).await;
        }
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    async fn join(&self, ctx: &mut ConnectionContext, req: RoomRequest) -> Outcome {
        let result = self.try_join(ctx, req).await;
        if let Err(reason) = &result {
            self.send_error(ctx, reason).await;
        }
        result
    }

    async fn try_join(&self, ctx: &mut ConnectionContext, req: RoomRequest) -> Outcome {
        let raw = req
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "projectId is required".to_string())?;
        let room = project_room(raw)?;
        let project = self.load_project(room).await?;
        check_join_room(&project.access(), ctx.identity.as_ref())
            .map_err(|e| AppError::from(e).client_message())?;

        if let Some(previous) = ctx.active_project.filter(|id| *id != project.id) {
            self.leave_room(ctx, previous).await;
        }
        self.hub.join(&ctx.conn_id, room).await;
        ctx.active_project = Some(project.id);

        let joined = json!({ "projectId": project.id });
        self.hub
            .send_to_conn(&ctx.conn_id, &ServerFrame::new(server_events::JOINED, joined.clone()))
            .await;
        if let Some(identity) = ctx.identity {
            self.presence(room, &identity, true).await;
        }
        tracing::info!(conn_id = %ctx.conn_id, project_id = %project.id, "Joined project room");
        Ok(joined)
    }

    async fn leave(&self, ctx: &mut ConnectionContext, req: RoomRequest) -> Outcome {
        let explicit = req
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let project_id = match explicit {
            Some(raw) => match parse_id(raw) {
                Some(id) => Some(id),
                None => {
                    let reason = "Invalid projectId".to_string();
                    self.send_error(ctx, &reason).await;
                    return Err(reason);
                }
            },
            None => ctx.active_project,
        };

        let left = match project_id {
            Some(id) => self.leave_room(ctx, id).await,
            None => false,
        };
        Ok(json!({ "projectId": project_id, "left": left }))
    }

    /// Leave a project room; presence goes out only when a membership was
    /// actually removed.
    async fn leave_room(&self, ctx: &mut ConnectionContext, project_id: DbId) -> bool {
        let room = Room::Project(project_id);
        let removed = self.hub.leave(&ctx.conn_id, room).await;
        if ctx.active_project == Some(project_id) {
            ctx.active_project = None;
        }
        if removed {
            if let Some(identity) = ctx.identity {
                self.presence(room, &identity, false).await;
            }
            tracing::info!(conn_id = %ctx.conn_id, project_id = %project_id, "Left project room");
        }
        removed
    }

    /// Room named by the payload's `projectId`, else the active project room.
    fn resolve_room(&self, ctx: &ConnectionContext, data: &Value) -> Result<Room, String> {
        match payload_project_id(data) {
            Some(raw) => project_room(raw.trim()),
            None => ctx
                .active_project
                .map(Room::Project)
                .ok_or_else(|| "No project room to send to".to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    async fn send_chat(&self, ctx: &ConnectionContext, payload: ChatPayload) -> Outcome {
        match self.try_send_chat(ctx, payload).await {
            Ok(view) => serde_json::to_value(&view).map_err(|e| {
                tracing::error!(error = %e, "Failed to encode chat message");
                SERVER_ERROR.to_string()
            }),
            Err(reason) => {
                tracing::debug!(conn_id = %ctx.conn_id, reason = %reason, "Chat send rejected");
                self.hub
                    .send_to_conn(
                        &ctx.conn_id,
                        &ServerFrame::new(server_events::CHAT_ERROR, json!({ "message": reason })),
                    )
                    .await;
                Err(reason)
            }
        }
    }

    async fn try_send_chat(
        &self,
        ctx: &ConnectionContext,
        payload: ChatPayload,
    ) -> Result<ChatMessageView, String> {
        let room = match payload
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(raw) => project_room(raw)?,
            None => ctx
                .active_project
                .map(Room::Project)
                .ok_or_else(|| "No project room to send to".to_string())?,
        };
        let project = self.load_project(room).await?;

        let sender = match ctx.identity {
            Some(identity) => ChatSender {
                id: identity.user_id,
                kind: identity.role.participant_kind(),
                role: Some(identity.role),
            },
            None => {
                let from = payload
                    .from
                    .as_deref()
                    .and_then(parse_id)
                    .ok_or_else(|| "Sender identity is required".to_string())?;
                let kind = payload
                    .from_model
                    .as_deref()
                    .and_then(|raw| raw.parse::<ParticipantKind>().ok())
                    .unwrap_or_else(|| infer_kind(&project, from));
                ChatSender {
                    id: from,
                    kind,
                    role: None,
                }
            }
        };

        let text = payload.text.unwrap_or_default().trim().to_string();

        let to = match payload.to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(parse_id(raw).ok_or_else(|| "Invalid recipient id".to_string())?),
            None => None,
        };
        let to_kind = match ctx.identity {
            Some(_) => None,
            None => payload
                .to_model
                .as_deref()
                .and_then(|raw| raw.parse::<ParticipantKind>().ok()),
        };

        let outgoing = OutgoingChat {
            to,
            to_kind,
            text,
            files: payload.files,
            message_type: payload.message_type.unwrap_or_default(),
        };
        self.chat
            .send(&project, sender, outgoing)
            .await
            .map_err(|e| e.client_message())
    }

    // -----------------------------------------------------------------------
    // Relays
    // -----------------------------------------------------------------------

    async fn relay(&self, ctx: &ConnectionContext, event: &str, data: Value) -> Outcome {
        let room = self.resolve_room(ctx, &data)?;
        let delivered = self.hub.send_to_room(room, &ServerFrame::new(event, data)).await;
        tracing::trace!(conn_id = %ctx.conn_id, event, room = %room, delivered, "Relayed event");
        Ok(json!({ "delivered": delivered }))
    }

    async fn read_receipt(&self, ctx: &ConnectionContext, data: Value) -> Outcome {
        let message_id = match &data {
            Value::String(id) => Some(id.clone()),
            other => other
                .get("messageId")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| "messageId is required".to_string())?;

        let room = self.resolve_room(ctx, &data)?;
        self.hub
            .send_to_room(
                room,
                &ServerFrame::new(
                    server_events::MESSAGE_STATUS,
                    json!({ "id": message_id, "status": "read" }),
                ),
            )
            .await;
        Ok(json!({ "id": message_id }))
    }

    // -----------------------------------------------------------------------
    // Deletes
    // -----------------------------------------------------------------------

    /// Silent unless the message exists and the caller may delete it.
    async fn delete_for_everyone(
        &self,
        ctx: &ConnectionContext,
        req: DeleteMessageRequest,
    ) -> Outcome {
        let (Some(identity), Some(message_id)) =
            (ctx.identity, req.message_id.as_deref().and_then(parse_id))
        else {
            return Ok(Value::Null);
        };

        let message = match self.stores.chats.find(message_id).await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(Value::Null),
            Err(e) => {
                tracing::error!(error = %e, message_id = %message_id, "Failed to load message");
                return Ok(Value::Null);
            }
        };
        if !can_delete_for_everyone(message.from_id, &identity) {
            tracing::debug!(conn_id = %ctx.conn_id, message_id = %message_id, "Delete refused");
            return Ok(Value::Null);
        }

        match self.stores.chats.delete(message_id).await {
            Ok(true) => {
                self.hub
                    .send_to_room(
                        Room::Project(message.project_id),
                        &ServerFrame::new(
                            server_events::DELETE_MESSAGE,
                            json!({ "messageId": message_id }),
                        ),
                    )
                    .await;
                tracing::info!(message_id = %message_id, user_id = %identity.user_id, "Message deleted");
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, message_id = %message_id, "Failed to delete message");
            }
        }
        Ok(Value::Null)
    }

    async fn delete_for_self(&self, ctx: &ConnectionContext, req: DeleteForMeRequest) -> Outcome {
        let result = self.try_delete_for_self(ctx, req).await;
        if let Err(reason) = &result {
            self.send_error(ctx, reason).await;
        }
        result
    }

    async fn try_delete_for_self(
        &self,
        ctx: &ConnectionContext,
        req: DeleteForMeRequest,
    ) -> Outcome {
        let message_id = req
            .message_id
            .as_deref()
            .and_then(parse_id)
            .ok_or_else(|| "messageId is required".to_string())?;
        let user_id = match ctx.identity {
            Some(identity) => identity.user_id,
            None => req
                .user_id
                .as_deref()
                .and_then(parse_id)
                .ok_or_else(|| "userId is required".to_string())?,
        };

        let hidden = self
            .stores
            .chats
            .hide_for(message_id, user_id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, message_id = %message_id, "Failed to hide message");
                SERVER_ERROR.to_string()
            })?;
        let Some(message) = hidden else {
            return Ok(Value::Null);
        };

        let notice = json!({ "messageId": message_id, "userId": user_id });
        self.hub
            .send_to_room(
                Room::Project(message.project_id),
                &ServerFrame::new(server_events::DELETE_MESSAGE_FOR_ME, notice.clone()),
            )
            .await;
        Ok(notice)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_project(&self, room: Room) -> Result<Project, String> {
        let Some(project_id) = room.project_id() else {
            return Err("Invalid projectId".to_string());
        };
        match self.stores.projects.find(project_id).await {
            Ok(Some(project)) => Ok(project),
            Ok(None) => Err("Project not found".to_string()),
            Err(e) => {
                tracing::error!(error = %e, project_id = %project_id, "Failed to load project");
                Err(SERVER_ERROR.to_string())
            }
        }
    }

    async fn presence(&self, room: Room, identity: &Identity, online: bool) {
        let update = PresenceUpdate::new(identity.user_id, online, identity.role);
        let data = serde_json::to_value(&update).unwrap_or(Value::Null);
        self.hub
            .send_to_room(room, &ServerFrame::new(server_events::PRESENCE_UPDATE, data))
            .await;
    }

    async fn send_error(&self, ctx: &ConnectionContext, message: &str) {
        self.hub
            .send_to_conn(
                &ctx.conn_id,
                &ServerFrame::new(server_events::ERROR, json!({ "message": message })),
            )
            .await;
    }

    async fn send_ack(&self, ctx: &ConnectionContext, ack_id: u64, reply: AckReply) {
        self.hub
            .send_to_conn(&ctx.conn_id, &ServerFrame::ack(ack_id, &reply))
            .await;
    }
}

/// Sender side for an unauthenticated send that named no model.
fn infer_kind(project: &Project, sender: DbId) -> ParticipantKind {
    if project.developer_id == Some(sender) {
        ParticipantKind::Developer
    } else {
        ParticipantKind::Client
    }
}
