use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use easyweb_core::protocol::ServerFrame;
use easyweb_core::rooms::Room;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Identifier of one live connection.
pub type ConnId = String;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Rooms this connection is a member of.
    pub rooms: HashSet<Room>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnId, WsConnection>,
    members: HashMap<Room, HashSet<ConnId>>,
}

impl HubState {
    fn unlink(&mut self, conn_id: &str, room: &Room) {
        if let Some(members) = self.members.get_mut(room) {
            members.remove(conn_id);
            if members.is_empty() {
                self.members.remove(room);
            }
        }
    }
}

/// Room directory and outbound fan-out for all live connections.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// the application. Each connection's channel is FIFO, so frames sent to a
/// room in order arrive at every member in that order.
#[derive(Default)]
pub struct RoomHub {
    state: RwLock<HubState>,
}

fn text_message(frame: &ServerFrame) -> Message {
    Message::Text(frame.to_json().into())
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: ConnId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            rooms: HashSet::new(),
        };
        self.state.write().await.connections.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and its memberships. Returns the rooms it was in.
    pub async fn remove(&self, conn_id: &str) -> Vec<Room> {
        let mut state = self.state.write().await;
        let Some(conn) = state.connections.remove(conn_id) else {
            return Vec::new();
        };
        let rooms: Vec<Room> = conn.rooms.into_iter().collect();
        for room in &rooms {
            state.unlink(conn_id, room);
        }
        rooms
    }

    /// Add `conn_id` to `room`. Returns `false` if it was already a member
    /// or the connection is gone.
    pub async fn join(&self, conn_id: &str, room: Room) -> bool {
        let mut state = self.state.write().await;
        let Some(conn) = state.connections.get_mut(conn_id) else {
            return false;
        };
        if !conn.rooms.insert(room) {
            return false;
        }
        state
            .members
            .entry(room)
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Remove `conn_id` from `room`. Returns `false` if it was not a member.
    pub async fn leave(&self, conn_id: &str, room: Room) -> bool {
        let mut state = self.state.write().await;
        let removed = state
            .connections
            .get_mut(conn_id)
            .is_some_and(|conn| conn.rooms.remove(&room));
        if removed {
            state.unlink(conn_id, &room);
        }
        removed
    }

    pub async fn is_member(&self, conn_id: &str, room: Room) -> bool {
        self.state
            .read()
            .await
            .members
            .get(&room)
            .is_some_and(|members| members.contains(conn_id))
    }

    pub async fn room_size(&self, room: Room) -> usize {
        self.state
            .read()
            .await
            .members
            .get(&room)
            .map_or(0, HashSet::len)
    }

    /// Send a frame to one connection. Returns `false` if it is gone.
    pub async fn send_to_conn(&self, conn_id: &str, frame: &ServerFrame) -> bool {
        let state = self.state.read().await;
        match state.connections.get(conn_id) {
            Some(conn) => conn.sender.send(text_message(frame)).is_ok(),
            None => false,
        }
    }

    /// Send a frame to every member of `room`.
    ///
    /// Returns the number of connections the frame was queued for. Closed
    /// channels are skipped; their connections are cleaned up when the
    /// receive loop ends.
    pub async fn send_to_room(&self, room: Room, frame: &ServerFrame) -> usize {
        let state = self.state.read().await;
        let Some(members) = state.members.get(&room) else {
            return 0;
        };
        let message = text_message(frame);
        members
            .iter()
            .filter_map(|id| state.connections.get(id))
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Send a frame to the union of several rooms' members. A connection in
    /// more than one of the rooms receives it once.
    pub async fn send_to_rooms(&self, rooms: &[Room], frame: &ServerFrame) -> usize {
        let state = self.state.read().await;
        let targets: HashSet<&ConnId> = rooms
            .iter()
            .filter_map(|room| state.members.get(room))
            .flatten()
            .collect();
        let message = text_message(frame);
        targets
            .into_iter()
            .filter_map(|id| state.connections.get(id))
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Send a Close frame to every connection, then clear the directory.
    pub async fn shutdown_all(&self) {
        let mut state = self.state.write().await;
        let count = state.connections.len();
        for conn in state.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        state.connections.clear();
        state.members.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client. Returns how many
    /// channels accepted it.
    pub async fn ping_all(&self) -> usize {
        let state = self.state.read().await;
        state
            .connections
            .values()
            .filter(|conn| conn.sender.send(Message::Ping(Bytes::new())).is_ok())
            .count()
    }
}
