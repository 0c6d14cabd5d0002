//! Display data for users referenced by projects and chat messages.
//!
//! Accounts are owned by the external auth service; this table only keeps
//! what the marketplace shows next to an id.

use easyweb_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
}
