//! WebSocket infrastructure for the real-time gateway.
//!
//! Provides the room hub, the per-connection event gateway, heartbeat
//! monitoring, and the HTTP upgrade handler used by Axum routes.

pub mod gateway;
mod handler;
mod heartbeat;
pub mod hub;

pub use gateway::{ConnectionContext, Gateway};
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use hub::RoomHub;
