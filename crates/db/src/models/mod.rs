pub mod chat_message;
pub mod project;
pub mod user;
