//! Well-known role names and the typed [`Role`] used for authorization.
//!
//! Role strings arrive inside access-token claims and are matched
//! case-insensitively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ROLE_CLIENT: &str = "client";
pub const ROLE_DEVELOPER: &str = "developer";
pub const ROLE_ADMIN: &str = "admin";

/// The role bound to an authenticated subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Developer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => ROLE_CLIENT,
            Role::Developer => ROLE_DEVELOPER,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// The participant kind recorded on timeline entries and chat messages
    /// authored under this role. Admins are recorded as client-side actors.
    pub fn participant_kind(self) -> ParticipantKind {
        match self {
            Role::Developer => ParticipantKind::Developer,
            Role::Client | Role::Admin => ParticipantKind::Client,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_CLIENT | "user" => Ok(Role::Client),
            ROLE_DEVELOPER => Ok(Role::Developer),
            ROLE_ADMIN => Ok(Role::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

/// Which side of the marketplace an actor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Client,
    Developer,
}

impl ParticipantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantKind::Client => ROLE_CLIENT,
            ParticipantKind::Developer => ROLE_DEVELOPER,
        }
    }

    /// The opposite side, used to infer a recipient kind.
    pub fn counterpart(self) -> Self {
        match self {
            ParticipantKind::Client => ParticipantKind::Developer,
            ParticipantKind::Developer => ParticipantKind::Client,
        }
    }
}

impl FromStr for ParticipantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_CLIENT | "user" => Ok(ParticipantKind::Client),
            ROLE_DEVELOPER => Ok(ParticipantKind::Developer),
            other => Err(format!("Unknown participant kind '{other}'")),
        }
    }
}
