//! Domain services behind the REST handlers and the gateway.

pub mod chat;
pub mod lifecycle;

pub use chat::{ChatSender, ChatService, OutgoingChat};
pub use lifecycle::LifecycleEngine;
