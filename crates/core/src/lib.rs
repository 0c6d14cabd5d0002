//! Domain layer for the easyweb project marketplace.
//!
//! Pure types and rules shared by the persistence layer, the REST command
//! layer, and the real-time gateway. Nothing in here performs I/O.

pub mod chat;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod roles;
pub mod rooms;
pub mod status;
pub mod types;
