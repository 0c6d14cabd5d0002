//! Chat message vocabulary shared by the store and the gateway.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    User,
    System,
    File,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::System => "system",
            MessageType::File => "file",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageType::User),
            "system" => Ok(MessageType::System),
            "file" => Ok(MessageType::File),
            other => Err(format!("Unknown message type '{other}'")),
        }
    }
}

/// A file reference attached to a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_defaults_to_user() {
        assert_eq!(MessageType::default(), MessageType::User);
    }

    #[test]
    fn message_type_round_trips_through_str() {
        for kind in [MessageType::User, MessageType::System, MessageType::File] {
            assert_eq!(kind.as_str().parse::<MessageType>(), Ok(kind));
        }
        assert!("video".parse::<MessageType>().is_err());
    }
}
