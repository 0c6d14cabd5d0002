/// All entity identifiers are UUIDs (`projects.id`, `users.id`, ...).
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Parse a client-supplied identifier. Returns `None` for anything that is
/// not a well-formed id.
pub fn parse_id(raw: &str) -> Option<DbId> {
    uuid::Uuid::parse_str(raw.trim()).ok()
}

/// Generate a fresh time-ordered identifier.
pub fn new_id() -> DbId {
    uuid::Uuid::now_v7()
}
