use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use easyweb_core::lifecycle::DeletionStatus;
use easyweb_core::status::ProjectStatus;
use easyweb_core::types::{new_id, DbId};

use super::{ChatStore, ProjectStore, StoreError, StoreResult, UserDirectory};
use crate::models::chat_message::{ChatMessage, NewChatMessage};
use crate::models::project::{
    CreateProject, DeletionRequest, Project, ProjectFilter, TimelineEntry, UpdateProject,
};
use crate::models::user::UserSummary;

#[derive(Default)]
struct MemoryState {
    projects: HashMap<DbId, Project>,
    /// Insertion order doubles as the tiebreaker for equal timestamps.
    messages: Vec<ChatMessage>,
    users: HashMap<DbId, UserSummary>,
}

/// In-process store. Every operation runs under one lock, so the
/// conditional updates are as atomic as their SQL counterparts.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

fn matches_filter(project: &Project, filter: ProjectFilter) -> bool {
    match filter {
        ProjectFilter::All => true,
        ProjectFilter::OwnedBy(id) => project.client_id == id,
        ProjectFilter::AssignedTo(id) => project.developer_id == Some(id),
        ProjectFilter::OpenUnassigned => {
            project.status == ProjectStatus::Open && project.developer_id.is_none()
        }
    }
}

fn deletion_pending(project: &Project) -> bool {
    project
        .deletion_request
        .as_ref()
        .is_some_and(|r| r.status == DeletionStatus::Requested)
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create(&self, client_id: DbId, input: &CreateProject) -> StoreResult<Project> {
        let now = chrono::Utc::now();
        let project = Project {
            id: new_id(),
            title: input.title.clone(),
            description: input.description.clone(),
            budget: input.budget,
            deadline: input.deadline,
            attachments: input.attachments.clone(),
            contact_email: input.contact_email.clone(),
            contact_phone: input.contact_phone.clone(),
            client_id,
            developer_id: None,
            accepted_at: None,
            status: ProjectStatus::Open,
            timeline: Vec::new(),
            deletion_request: None,
            created_at: now,
            updated_at: now,
        };
        self.state()?.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(self.state()?.projects.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Project>> {
        let state = self.state()?;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_owned(&self, client_id: DbId) -> StoreResult<i64> {
        let state = self.state()?;
        Ok(state
            .projects
            .values()
            .filter(|p| p.client_id == client_id)
            .count() as i64)
    }

    async fn update(&self, id: DbId, input: &UpdateProject) -> StoreResult<Option<Project>> {
        let mut state = self.state()?;
        Ok(state.projects.get_mut(&id).map(|project| {
            project.title = input.title.clone();
            project.description = input.description.clone();
            project.budget = input.budget;
            project.deadline = input.deadline;
            project.updated_at = chrono::Utc::now();
            project.clone()
        }))
    }

    async fn accept(
        &self,
        id: DbId,
        developer_id: DbId,
        entry: &TimelineEntry,
    ) -> StoreResult<Option<Project>> {
        let mut state = self.state()?;
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(None);
        };
        if project.status != ProjectStatus::Open || project.developer_id.is_some() {
            return Ok(None);
        }
        project.developer_id = Some(developer_id);
        project.status = ProjectStatus::InProgress;
        project.accepted_at = Some(entry.created_at);
        project.timeline.push(entry.clone());
        project.updated_at = chrono::Utc::now();
        Ok(Some(project.clone()))
    }

    async fn append_timeline(
        &self,
        id: DbId,
        entry: &TimelineEntry,
        status: Option<ProjectStatus>,
    ) -> StoreResult<Option<Project>> {
        let mut state = self.state()?;
        Ok(state.projects.get_mut(&id).map(|project| {
            project.timeline.push(entry.clone());
            if let Some(status) = status {
                project.status = status;
            }
            project.updated_at = chrono::Utc::now();
            project.clone()
        }))
    }

    async fn request_deletion(
        &self,
        id: DbId,
        request: &DeletionRequest,
    ) -> StoreResult<Option<Project>> {
        let mut state = self.state()?;
        let Some(project) = state.projects.get_mut(&id) else {
            return Ok(None);
        };
        if project.developer_id.is_none() || deletion_pending(project) {
            return Ok(None);
        }
        project.deletion_request = Some(request.clone());
        project.updated_at = chrono::Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_if_deletion_requested(&self, id: DbId) -> StoreResult<Option<Project>> {
        let mut state = self.state()?;
        if !state.projects.get(&id).is_some_and(deletion_pending) {
            return Ok(None);
        }
        let removed = state.projects.remove(&id);
        state.messages.retain(|m| m.project_id != id);
        Ok(removed)
    }

    async fn delete_if_open(&self, id: DbId) -> StoreResult<bool> {
        let mut state = self.state()?;
        let deletable = state.projects.get(&id).is_some_and(|p| {
            p.status == ProjectStatus::Open && p.developer_id.is_none() && p.accepted_at.is_none()
        });
        if deletable {
            state.projects.remove(&id);
            state.messages.retain(|m| m.project_id != id);
        }
        Ok(deletable)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert(&self, input: &NewChatMessage) -> StoreResult<ChatMessage> {
        let message = ChatMessage {
            id: new_id(),
            project_id: input.project_id,
            from_id: input.from_id,
            from_kind: input.from_kind,
            to_id: input.to_id,
            to_kind: input.to_kind,
            text: input.text.clone(),
            files: input.files.clone(),
            message_type: input.message_type,
            sent_at: chrono::Utc::now(),
            deleted_for: Vec::new(),
        };
        self.state()?.messages.push(message.clone());
        Ok(message)
    }

    async fn find(&self, id: DbId) -> StoreResult<Option<ChatMessage>> {
        Ok(self.state()?.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        let mut state = self.state()?;
        let before = state.messages.len();
        state.messages.retain(|m| m.id != id);
        Ok(state.messages.len() < before)
    }

    async fn hide_for(&self, id: DbId, user_id: DbId) -> StoreResult<Option<ChatMessage>> {
        let mut state = self.state()?;
        Ok(state.messages.iter_mut().find(|m| m.id == id).map(|message| {
            if !message.deleted_for.contains(&user_id) {
                message.deleted_for.push(user_id);
            }
            message.clone()
        }))
    }

    async fn history(&self, project_id: DbId, viewer: DbId) -> StoreResult<Vec<ChatMessage>> {
        let state = self.state()?;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| m.project_id == project_id && !m.is_hidden_for(viewer))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<UserSummary>> {
        let state = self.state()?;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn upsert(&self, user: &UserSummary) -> StoreResult<UserSummary> {
        self.state()?.users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use easyweb_core::chat::MessageType;
    use easyweb_core::roles::ParticipantKind;

    use super::*;

    fn create_input() -> CreateProject {
        CreateProject {
            title: "Portfolio".into(),
            description: "Static site".into(),
            budget: 250.0,
            deadline: chrono::Utc::now(),
            attachments: vec![],
            contact_email: None,
            contact_phone: None,
        }
    }

    fn accept_entry(dev: DbId) -> TimelineEntry {
        TimelineEntry::new(ProjectStatus::InProgress, "accepted", dev, ParticipantKind::Developer)
    }

    fn chat(project_id: DbId, from: DbId, text: &str) -> NewChatMessage {
        NewChatMessage {
            project_id,
            from_id: from,
            from_kind: ParticipantKind::Client,
            to_id: None,
            to_kind: None,
            text: text.into(),
            files: vec![],
            message_type: MessageType::User,
        }
    }

    #[tokio::test]
    async fn accept_only_succeeds_once() {
        let store = MemoryStore::new();
        let project = store.create(uuid::Uuid::new_v4(), &create_input()).await.unwrap();
        let (first, second) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());

        let won = store.accept(project.id, first, &accept_entry(first)).await.unwrap();
        assert_matches!(won, Some(p) if p.developer_id == Some(first) && p.timeline.len() == 1);

        let lost = store.accept(project.id, second, &accept_entry(second)).await.unwrap();
        assert!(lost.is_none());

        let stored = ProjectStore::find(&store, project.id).await.unwrap().unwrap();
        assert_eq!(stored.developer_id, Some(first));
        assert_eq!(stored.status, ProjectStatus::InProgress);
    }

    #[tokio::test]
    async fn pending_deletion_request_is_not_overwritten() {
        let store = MemoryStore::new();
        let client = uuid::Uuid::new_v4();
        let dev = uuid::Uuid::new_v4();
        let project = store.create(client, &create_input()).await.unwrap();
        store.accept(project.id, dev, &accept_entry(dev)).await.unwrap();

        let first = DeletionRequest::requested(client, Some("budget cut".into()));
        assert!(store.request_deletion(project.id, &first).await.unwrap().is_some());
        let second = DeletionRequest::requested(client, None);
        assert!(store.request_deletion(project.id, &second).await.unwrap().is_none());

        let stored = ProjectStore::find(&store, project.id).await.unwrap().unwrap();
        assert_eq!(
            stored.deletion_request.and_then(|r| r.reason).as_deref(),
            Some("budget cut")
        );
    }

    #[tokio::test]
    async fn approved_deletion_removes_chat_history() {
        let store = MemoryStore::new();
        let client = uuid::Uuid::new_v4();
        let dev = uuid::Uuid::new_v4();
        let project = store.create(client, &create_input()).await.unwrap();
        store.accept(project.id, dev, &accept_entry(dev)).await.unwrap();
        store.insert(&chat(project.id, client, "hi")).await.unwrap();

        assert!(store.delete_if_deletion_requested(project.id).await.unwrap().is_none());

        store
            .request_deletion(project.id, &DeletionRequest::requested(client, None))
            .await
            .unwrap();
        assert!(store.delete_if_deletion_requested(project.id).await.unwrap().is_some());
        assert!(store.history(project.id, client).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hide_for_is_idempotent_and_filters_history() {
        let store = MemoryStore::new();
        let client = uuid::Uuid::new_v4();
        let dev = uuid::Uuid::new_v4();
        let project_id = uuid::Uuid::new_v4();
        let first = store.insert(&chat(project_id, client, "one")).await.unwrap();
        store.insert(&chat(project_id, client, "two")).await.unwrap();

        store.hide_for(first.id, dev).await.unwrap();
        let hidden = store.hide_for(first.id, dev).await.unwrap().unwrap();
        assert_eq!(hidden.deleted_for, vec![dev]);

        let for_dev: Vec<String> = store
            .history(project_id, dev)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(for_dev, vec!["two"]);
        assert_eq!(store.history(project_id, client).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn open_delete_refuses_assigned_projects() {
        let store = MemoryStore::new();
        let client = uuid::Uuid::new_v4();
        let open = store.create(client, &create_input()).await.unwrap();
        let taken = store.create(client, &create_input()).await.unwrap();
        let dev = uuid::Uuid::new_v4();
        store.accept(taken.id, dev, &accept_entry(dev)).await.unwrap();

        assert!(store.delete_if_open(open.id).await.unwrap());
        assert!(!store.delete_if_open(taken.id).await.unwrap());
        assert_eq!(store.count_owned(client).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_filtered() {
        let store = MemoryStore::new();
        let client = uuid::Uuid::new_v4();
        let a = store.create(client, &create_input()).await.unwrap();
        let b = store.create(client, &create_input()).await.unwrap();
        store.create(uuid::Uuid::new_v4(), &create_input()).await.unwrap();

        let owned = store.list(ProjectFilter::OwnedBy(client), 10, 0).await.unwrap();
        let ids: Vec<DbId> = owned.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let page = store.list(ProjectFilter::All, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
    }
}
