//! WebSocket wire protocol for the real-time gateway.
//!
//! Every frame is a JSON text message with an `event` name and a `data`
//! payload. Client frames may carry an `ack` id; the server answers those
//! with an `ack` frame carrying the same id.
//!
//! ```text
//! client -> { "event": "chat-message", "data": { "projectId": "...", "text": "hi" }, "ack": 3 }
//! server -> { "event": "ack", "ack": 3, "data": { "ok": true, "message": { ... } } }
//! server -> { "event": "chat-message", "data": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::{ChatFile, MessageType};
use crate::roles::Role;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names sent by clients.
pub mod client_events {
    pub const JOIN: &str = "join";
    pub const JOIN_LEGACY: &str = "join-room";
    pub const LEAVE: &str = "leave";
    pub const LEAVE_LEGACY: &str = "leave-room";
    pub const CHAT_MESSAGE: &str = "chat-message";
    pub const TYPING: &str = "typing";
    pub const STOP_TYPING: &str = "stop-typing";
    pub const DELETE_MESSAGE: &str = "delete-message";
    pub const DELETE_MESSAGE_FOR_ME: &str = "delete-message-for-me";
    pub const READ_MESSAGE: &str = "read-message";
}

/// Event names emitted by the server.
pub mod server_events {
    pub const ACK: &str = "ack";
    pub const JOINED: &str = "joined";
    pub const ERROR: &str = "error";
    pub const PRESENCE_UPDATE: &str = "presence:update";
    pub const CHAT_MESSAGE: &str = "chat-message";
    pub const CHAT_ERROR: &str = "chat-error";
    pub const TYPING: &str = "typing";
    pub const STOP_TYPING: &str = "stop-typing";
    pub const DELETE_MESSAGE: &str = "delete-message";
    pub const DELETE_MESSAGE_FOR_ME: &str = "delete-message-for-me";
    pub const MESSAGE_STATUS: &str = "message-status";
    pub const PROJECT_CREATED: &str = "project:created";
    pub const PROJECT_ACCEPTED: &str = "project:accepted";
    pub const TIMELINE_UPDATE: &str = "timeline:update";
    pub const PROJECT_DELETION_REQUESTED: &str = "project:deletionRequested";
    pub const PROJECT_DELETION_APPROVED: &str = "project:deletionApproved";
}

/// Peer-to-peer call signaling events. Each is relayed under its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    Hangup,
    LegacyOffer,
    LegacyAnswer,
    LegacyIceCandidate,
}

impl SignalKind {
    pub fn from_event(event: &str) -> Option<Self> {
        match event {
            "webrtc-offer" => Some(SignalKind::Offer),
            "webrtc-answer" => Some(SignalKind::Answer),
            "webrtc-ice-candidate" => Some(SignalKind::IceCandidate),
            "webrtc-hangup" => Some(SignalKind::Hangup),
            "video-offer" => Some(SignalKind::LegacyOffer),
            "video-answer" => Some(SignalKind::LegacyAnswer),
            "ice-candidate" => Some(SignalKind::LegacyIceCandidate),
            _ => None,
        }
    }

    /// Event name used for the relayed frame.
    pub fn event_name(self) -> &'static str {
        match self {
            SignalKind::Offer => "webrtc-offer",
            SignalKind::Answer => "webrtc-answer",
            SignalKind::IceCandidate => "webrtc-ice-candidate",
            SignalKind::Hangup => "webrtc-hangup",
            SignalKind::LegacyOffer => "video-offer",
            SignalKind::LegacyAnswer => "video-answer",
            SignalKind::LegacyIceCandidate => "ice-candidate",
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A raw inbound frame, before the payload is interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl ServerFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
            ack: None,
        }
    }

    /// Acknowledgement for the client frame carrying `ack_id`.
    pub fn ack(ack_id: u64, reply: &AckReply) -> Self {
        Self {
            event: server_events::ACK.to_string(),
            data: serde_json::to_value(reply).unwrap_or(Value::Null),
            ack: Some(ack_id),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Body of an `ack` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckReply {
    pub fn success(message: Value) -> Self {
        Self {
            ok: true,
            message: Some(message),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// `join` / `leave` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    #[serde(default)]
    pub project_id: Option<String>,
}

/// `chat-message` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default, alias = "project")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub files: Vec<ChatFile>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub to_model: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub from_model: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<MessageType>,
}

/// `delete-message` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub message_id: Option<String>,
}

/// `delete-message-for-me` payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteForMeRequest {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `presence:update` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user_id: String,
    pub online: bool,
    pub role: Role,
}

impl PresenceUpdate {
    pub fn new(user_id: DbId, online: bool, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            online,
            role,
        }
    }
}

/// A decoded client event.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Join(RoomRequest),
    Leave(RoomRequest),
    ChatMessage(ChatPayload),
    Typing(Value),
    StopTyping(Value),
    DeleteMessage(DeleteMessageRequest),
    DeleteMessageForMe(DeleteForMeRequest),
    /// Read receipt; the payload is the message id (bare string or `{ "messageId" }`).
    ReadMessage(Value),
    Signal(SignalKind, Value),
}

impl ClientEvent {
    /// Interpret a raw frame. Unknown event names and payloads of the wrong
    /// shape are protocol errors.
    pub fn decode(frame: &ClientFrame) -> Result<Self, ProtocolError> {
        use client_events::*;

        let data = match &frame.data {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        let event = match frame.event.as_str() {
            JOIN | JOIN_LEGACY => ClientEvent::Join(payload(data)?),
            LEAVE | LEAVE_LEGACY => ClientEvent::Leave(payload(data)?),
            CHAT_MESSAGE => ClientEvent::ChatMessage(payload(data)?),
            TYPING => ClientEvent::Typing(data),
            STOP_TYPING => ClientEvent::StopTyping(data),
            DELETE_MESSAGE => ClientEvent::DeleteMessage(payload(data)?),
            DELETE_MESSAGE_FOR_ME => ClientEvent::DeleteMessageForMe(payload(data)?),
            READ_MESSAGE => ClientEvent::ReadMessage(data),
            other => match SignalKind::from_event(other) {
                Some(kind) => ClientEvent::Signal(kind, data),
                None => return Err(ProtocolError::UnknownEvent(other.to_string())),
            },
        };
        Ok(event)
    }
}

fn payload<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Explicit `projectId` (or legacy `project`) carried by a relay payload.
pub fn payload_project_id(data: &Value) -> Option<&str> {
    data.get("projectId")
        .or_else(|| data.get("project"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Errors decoding inbound frames.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
