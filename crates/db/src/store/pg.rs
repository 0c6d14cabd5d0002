use async_trait::async_trait;
use easyweb_core::status::ProjectStatus;
use easyweb_core::types::{new_id, DbId};

use super::{ChatStore, ProjectStore, StoreResult, UserDirectory};
use crate::models::chat_message::{ChatMessage, NewChatMessage};
use crate::models::project::{
    CreateProject, DeletionRequest, Project, ProjectFilter, TimelineEntry, UpdateProject,
};
use crate::models::user::UserSummary;
use crate::repositories::{ChatMessageRepo, ProjectRepo, UserRepo};
use crate::DbPool;

/// Postgres-backed store. Thin delegation to the repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create(&self, client_id: DbId, input: &CreateProject) -> StoreResult<Project> {
        Ok(ProjectRepo::create(&self.pool, new_id(), client_id, input).await?)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(
        &self,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Project>> {
        Ok(ProjectRepo::list(&self.pool, filter, limit, offset).await?)
    }

    async fn count_owned(&self, client_id: DbId) -> StoreResult<i64> {
        Ok(ProjectRepo::count_by_client(&self.pool, client_id).await?)
    }

    async fn update(&self, id: DbId, input: &UpdateProject) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::update(&self.pool, id, input).await?)
    }

    async fn accept(
        &self,
        id: DbId,
        developer_id: DbId,
        entry: &TimelineEntry,
    ) -> StoreResult<Option<Project>> {
        let accepted = ProjectRepo::accept(&self.pool, id, developer_id, entry).await?;
        if accepted.is_none() {
            tracing::debug!(project_id = %id, developer_id = %developer_id, "Conditional accept matched no row");
        }
        Ok(accepted)
    }

    async fn append_timeline(
        &self,
        id: DbId,
        entry: &TimelineEntry,
        status: Option<ProjectStatus>,
    ) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::append_timeline(&self.pool, id, entry, status).await?)
    }

    async fn request_deletion(
        &self,
        id: DbId,
        request: &DeletionRequest,
    ) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::request_deletion(&self.pool, id, request).await?)
    }

    async fn delete_if_deletion_requested(&self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::delete_if_deletion_requested(&self.pool, id).await?)
    }

    async fn delete_if_open(&self, id: DbId) -> StoreResult<bool> {
        Ok(ProjectRepo::delete_if_open(&self.pool, id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn insert(&self, input: &NewChatMessage) -> StoreResult<ChatMessage> {
        Ok(ChatMessageRepo::insert(&self.pool, new_id(), input).await?)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<ChatMessage>> {
        Ok(ChatMessageRepo::find_by_id(&self.pool, id).await?)
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        Ok(ChatMessageRepo::delete(&self.pool, id).await?)
    }

    async fn hide_for(&self, id: DbId, user_id: DbId) -> StoreResult<Option<ChatMessage>> {
        Ok(ChatMessageRepo::hide_for(&self.pool, id, user_id).await?)
    }

    async fn history(&self, project_id: DbId, viewer: DbId) -> StoreResult<Vec<ChatMessage>> {
        Ok(ChatMessageRepo::history(&self.pool, project_id, viewer).await?)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<UserSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(UserRepo::find_many(&self.pool, ids).await?)
    }

    async fn upsert(&self, user: &UserSummary) -> StoreResult<UserSummary> {
        Ok(UserRepo::upsert(&self.pool, user).await?)
    }
}
