//! Store traits the API layer is written against.
//!
//! [`PgStore`] backs them with the Postgres repositories; [`MemoryStore`]
//! keeps everything in process for local runs without a database and for
//! tests. Both honour the same conditional-update contracts: `accept` only
//! succeeds against an open, unassigned project, and deletion approval only
//! against a pending request.

use std::sync::Arc;

use async_trait::async_trait;
use easyweb_core::status::ProjectStatus;
use easyweb_core::types::DbId;

use crate::models::chat_message::{ChatMessage, NewChatMessage};
use crate::models::project::{
    CreateProject, DeletionRequest, Project, ProjectFilter, TimelineEntry, UpdateProject,
};
use crate::models::user::UserSummary;

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Failure talking to the backing store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create(&self, client_id: DbId, input: &CreateProject) -> StoreResult<Project>;

    async fn find(&self, id: DbId) -> StoreResult<Option<Project>>;

    /// Newest first.
    async fn list(
        &self,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Project>>;

    async fn count_owned(&self, client_id: DbId) -> StoreResult<i64>;

    async fn update(&self, id: DbId, input: &UpdateProject) -> StoreResult<Option<Project>>;

    /// Compare-and-swap assignment. `None` means the project was not open
    /// and unassigned at the instant of the write (or does not exist).
    async fn accept(
        &self,
        id: DbId,
        developer_id: DbId,
        entry: &TimelineEntry,
    ) -> StoreResult<Option<Project>>;

    async fn append_timeline(
        &self,
        id: DbId,
        entry: &TimelineEntry,
        status: Option<ProjectStatus>,
    ) -> StoreResult<Option<Project>>;

    /// `None` when a request is already pending or no developer is assigned.
    async fn request_deletion(
        &self,
        id: DbId,
        request: &DeletionRequest,
    ) -> StoreResult<Option<Project>>;

    /// Delete the project (and its chat history) only while its deletion
    /// request is pending. Returns the removed project.
    async fn delete_if_deletion_requested(&self, id: DbId) -> StoreResult<Option<Project>>;

    /// Delete the project only while it is open and unassigned.
    async fn delete_if_open(&self, id: DbId) -> StoreResult<bool>;

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Persist a message; the store assigns the id and timestamp.
    async fn insert(&self, input: &NewChatMessage) -> StoreResult<ChatMessage>;

    async fn find(&self, id: DbId) -> StoreResult<Option<ChatMessage>>;

    async fn delete(&self, id: DbId) -> StoreResult<bool>;

    /// Idempotent set-add of `user_id` to the deleted-for set.
    async fn hide_for(&self, id: DbId, user_id: DbId) -> StoreResult<Option<ChatMessage>>;

    /// Ascending by timestamp, excluding messages `viewer` hid.
    async fn history(&self, project_id: DbId, viewer: DbId) -> StoreResult<Vec<ChatMessage>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<UserSummary>>;

    /// Insert or refresh display data mirrored from the identity service.
    async fn upsert(&self, user: &UserSummary) -> StoreResult<UserSummary>;
}

/// The store handles shared by request handlers and the gateway.
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub chats: Arc<dyn ChatStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl Stores {
    pub fn postgres(pool: crate::DbPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            projects: store.clone(),
            chats: store.clone(),
            users: store,
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            projects: store.clone(),
            chats: store.clone(),
            users: store,
        }
    }
}
