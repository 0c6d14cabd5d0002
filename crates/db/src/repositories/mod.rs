pub mod chat_message_repo;
pub mod project_repo;
pub mod user_repo;

pub use chat_message_repo::ChatMessageRepo;
pub use project_repo::ProjectRepo;
pub use user_repo::UserRepo;
