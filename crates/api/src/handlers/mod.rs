pub mod chat;
pub mod project;

use easyweb_core::types::{parse_id, DbId};

use crate::error::AppError;

/// Parse a path id, rejecting malformed values with 400.
pub(crate) fn path_id(raw: &str) -> Result<DbId, AppError> {
    parse_id(raw).ok_or_else(|| AppError::BadRequest("Invalid projectId".into()))
}
