//! Project lifecycle engine.
//!
//! Runs every project transition: rule check, conditional store write, then
//! room notification. Shared by the REST handlers; the gateway only reads
//! projects for room authorization.

use easyweb_core::error::CoreError;
use easyweb_core::lifecycle::{
    check_accept, check_approve_deletion, check_create, check_direct_delete, check_edit,
    check_post_timeline, check_request_deletion, check_timeline_target, check_view,
    DeletionStatus, Identity,
};
use easyweb_core::roles::{ParticipantKind, Role};
use easyweb_core::status::{normalize_status, ProjectStatus};
use easyweb_core::types::DbId;
use easyweb_db::models::project::{
    CreateProject, DeletionRequest, Project, ProjectFilter, TimelineEntry, TimelineUpdate,
    UpdateProject,
};
use easyweb_db::Stores;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::notifications::{DeveloperCard, Notifier};

/// Open-project feed size for developers.
pub const OPEN_FEED_LIMIT: i64 = 50;

const ACCEPTED_MESSAGE: &str = "Project accepted by developer";

pub struct LifecycleEngine {
    stores: Stores,
    notifier: Notifier,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Project",
        id,
    })
}

impl LifecycleEngine {
    pub fn new(stores: Stores, notifier: Notifier) -> Self {
        Self { stores, notifier }
    }

    /// Load a project or fail with `NotFound`.
    pub async fn load(&self, id: DbId) -> AppResult<Project> {
        self.stores
            .projects
            .find(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, identity: &Identity, input: CreateProject) -> AppResult<Project> {
        check_create(identity)?;
        let input = input.trimmed();
        input.validate()?;

        let project = self.stores.projects.create(identity.user_id, &input).await?;
        tracing::info!(project_id = %project.id, client_id = %identity.user_id, "Project created");

        self.notifier.project_created(&project).await;
        Ok(project)
    }

    pub async fn get(&self, identity: &Identity, id: DbId) -> AppResult<Project> {
        let project = self.load(id).await?;
        check_view(&project.access(), identity)?;
        Ok(project)
    }

    /// Role-scoped listing: clients see their own, developers their
    /// assignments, admins everything.
    pub async fn list(
        &self,
        identity: &Identity,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Project>> {
        let filter = match identity.role {
            Role::Client => ProjectFilter::OwnedBy(identity.user_id),
            Role::Developer => ProjectFilter::AssignedTo(identity.user_id),
            Role::Admin => ProjectFilter::All,
        };
        Ok(self.stores.projects.list(filter, limit, offset).await?)
    }

    /// Open, unassigned projects, newest first.
    pub async fn list_open(&self) -> AppResult<Vec<Project>> {
        Ok(self
            .stores
            .projects
            .list(ProjectFilter::OpenUnassigned, OPEN_FEED_LIMIT, 0)
            .await?)
    }

    pub async fn count_owned(&self, identity: &Identity) -> AppResult<i64> {
        Ok(self.stores.projects.count_owned(identity.user_id).await?)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: DbId,
        input: UpdateProject,
    ) -> AppResult<Project> {
        let project = self.load(id).await?;
        check_edit(&project.access(), identity)?;
        let input = input.trimmed();
        input.validate()?;

        self.stores
            .projects
            .update(id, &input)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Assign the calling developer. Exactly one of several concurrent
    /// callers wins; the rest get `Conflict`.
    pub async fn accept(&self, identity: &Identity, id: DbId) -> AppResult<Project> {
        check_accept(identity)?;
        let current = self.load(id).await?;
        if current.status != ProjectStatus::Open || current.developer_id.is_some() {
            return Err(already_accepted());
        }

        let entry = TimelineEntry::new(
            ProjectStatus::InProgress,
            ACCEPTED_MESSAGE,
            identity.user_id,
            ParticipantKind::Developer,
        );
        let Some(project) = self
            .stores
            .projects
            .accept(id, identity.user_id, &entry)
            .await?
        else {
            // Lost the race, or the project vanished in between.
            return match self.stores.projects.find(id).await? {
                Some(_) => Err(already_accepted()),
                None => Err(not_found(id)),
            };
        };
        tracing::info!(project_id = %id, developer_id = %identity.user_id, "Project accepted");

        let summary = self.stores.users.find_many(&[identity.user_id]).await;
        let summary = summary.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load developer display data");
            Vec::new()
        });
        let card = DeveloperCard::new(identity.user_id, summary.first(), project.accepted_at);
        self.notifier.project_accepted(&project, &card).await;
        if let Some(entry) = project.last_entry() {
            self.notifier.timeline_updated(&project, entry).await;
        }
        Ok(project)
    }

    /// Append a timeline entry; a supplied status is normalized first and
    /// becomes the project's status.
    pub async fn post_timeline(
        &self,
        identity: &Identity,
        id: DbId,
        update: TimelineUpdate,
    ) -> AppResult<Project> {
        let project = self.load(id).await?;
        check_post_timeline(&project.access(), identity)?;

        let raw_status = update.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let message = update
            .message
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if raw_status.is_none() && message.is_empty() {
            return Err(CoreError::Validation("Provide a status or a message".into()).into());
        }
        let status = raw_status
            .map(normalize_status)
            .transpose()
            .map_err(CoreError::Validation)?;
        if let Some(target) = status {
            check_timeline_target(&project.access(), target)?;
        }

        let entry = TimelineEntry::new(
            status.unwrap_or(project.status),
            message,
            identity.user_id,
            identity.role.participant_kind(),
        );
        let updated = self
            .stores
            .projects
            .append_timeline(id, &entry, status)
            .await?
            .ok_or_else(|| not_found(id))?;
        tracing::info!(
            project_id = %id,
            status = %updated.status,
            "Timeline entry appended"
        );

        self.notifier.timeline_updated(&updated, &entry).await;
        Ok(updated)
    }

    /// Timeline in creation order.
    pub async fn timeline(&self, identity: &Identity, id: DbId) -> AppResult<Vec<TimelineEntry>> {
        let project = self.get(identity, id).await?;
        let mut timeline = project.timeline;
        timeline.sort_by_key(|entry| entry.created_at);
        Ok(timeline)
    }

    /// Open the deletion workflow. A pending request is never overwritten.
    pub async fn request_deletion(
        &self,
        identity: &Identity,
        id: DbId,
        reason: Option<String>,
    ) -> AppResult<Project> {
        let project = self.load(id).await?;
        check_request_deletion(&project.access(), identity)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let request = DeletionRequest::requested(identity.user_id, reason);
        let Some(updated) = self.stores.projects.request_deletion(id, &request).await? else {
            return Err(CoreError::Conflict(
                "A deletion request is already pending for this project".into(),
            )
            .into());
        };
        tracing::info!(project_id = %id, client_id = %identity.user_id, "Deletion requested");

        let client_name = match self.stores.users.find_many(&[updated.client_id]).await {
            Ok(users) => users.into_iter().next().map(|u| u.name),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load client display data");
                None
            }
        };
        self.notifier
            .deletion_requested(&updated, &request, client_name.as_deref())
            .await;
        Ok(updated)
    }

    /// Approve a pending request and permanently delete the project along
    /// with its chat history. Returns the approved request record.
    pub async fn approve_deletion(
        &self,
        identity: &Identity,
        id: DbId,
    ) -> AppResult<(Project, DeletionRequest)> {
        let project = self.load(id).await?;
        check_approve_deletion(&project.access(), identity)?;

        let Some(removed) = self.stores.projects.delete_if_deletion_requested(id).await? else {
            return Err(
                CoreError::Validation("No active deletion request to approve".into()).into(),
            );
        };
        let mut approval = removed
            .deletion_request
            .clone()
            .unwrap_or_else(|| DeletionRequest::requested(removed.client_id, None));
        approval.status = DeletionStatus::Approved;
        approval.approved_by = Some(identity.user_id);
        approval.approved_by_kind = Some(ParticipantKind::Developer);
        approval.approved_at = Some(chrono::Utc::now());
        tracing::info!(project_id = %id, developer_id = %identity.user_id, "Deletion approved, project removed");

        self.notifier.deletion_approved(&removed, &approval).await;
        Ok((removed, approval))
    }

    /// Owner deletes a project nobody has accepted.
    pub async fn direct_delete(&self, identity: &Identity, id: DbId) -> AppResult<()> {
        let project = self.load(id).await?;
        check_direct_delete(&project.access(), identity)?;

        if !self.stores.projects.delete_if_open(id).await? {
            // Accepted between the check and the delete.
            return Err(CoreError::Validation(
                "Cannot delete a project that has been accepted by a developer. \
                 Please request deletion and wait for developer approval."
                    .into(),
            )
            .into());
        }
        tracing::info!(project_id = %id, client_id = %identity.user_id, "Project deleted");
        Ok(())
    }
}

fn already_accepted() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Project has already been accepted by another developer".into(),
    ))
}
