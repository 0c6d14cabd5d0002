//! Room addressing for the real-time gateway.
//!
//! Every push is addressed to a room. A room is either a subject's personal
//! room, the shared developer broadcast room, or a single project's room.

use std::fmt;

use crate::types::{parse_id, DbId};

/// Literal name of the room every authenticated developer joins.
pub const DEVELOPERS_ROOM: &str = "developers";

/// An addressable broadcast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Room {
    /// Private room of one subject, named by the subject id.
    Personal(DbId),
    /// Shared room of all connected developers.
    Developers,
    /// Room of one project (its client and assigned developer).
    Project(DbId),
}

impl Room {
    /// Wire/room-name form of this room.
    pub fn name(&self) -> String {
        match self {
            Room::Personal(id) | Room::Project(id) => id.to_string(),
            Room::Developers => DEVELOPERS_ROOM.to_string(),
        }
    }

    pub fn project_id(&self) -> Option<DbId> {
        match self {
            Room::Project(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_personal(&self) -> bool {
        matches!(self, Room::Personal(_))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Resolve a client-supplied project room identifier.
///
/// Returns `Err` with a caller-facing message when the identifier is not a
/// well-formed project id.
pub fn project_room(raw: &str) -> Result<Room, String> {
    parse_id(raw)
        .map(Room::Project)
        .ok_or_else(|| "Invalid projectId".to_string())
}
