//! Project lifecycle rules.
//!
//! Authorization and transition checks for the project state machine:
//!
//! ```text
//! open --accept--> in progress --timeline--> {in progress, testing, qa, completed}
//! open --direct delete--> deleted
//! (accepted) --request deletion--> requested --approve--> deleted
//! ```
//!
//! These functions only inspect a [`ProjectAccess`] snapshot; the store and
//! the notification fan-out live in the API crate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::status::ProjectStatus;
use crate::types::DbId;

/// An authenticated subject as produced by the identity verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: DbId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// State of the single-slot deletion workflow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionStatus {
    Requested,
    Approved,
    Cancelled,
}

/// The fields of a project that authorization decisions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectAccess {
    pub client_id: DbId,
    pub developer_id: Option<DbId>,
    pub status: ProjectStatus,
    pub accepted: bool,
    pub deletion: Option<DeletionStatus>,
}

impl ProjectAccess {
    pub fn is_client(&self, user_id: DbId) -> bool {
        self.client_id == user_id
    }

    pub fn is_developer(&self, user_id: DbId) -> bool {
        self.developer_id == Some(user_id)
    }

    /// Client owner or assigned developer.
    pub fn is_participant(&self, user_id: DbId) -> bool {
        self.is_client(user_id) || self.is_developer(user_id)
    }
}

/// Read access: owner, assigned developer, or admin.
pub fn check_view(project: &ProjectAccess, identity: &Identity) -> Result<(), CoreError> {
    if identity.role == Role::Admin || project.is_participant(identity.user_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Not authorized to view this project".into(),
        ))
    }
}

/// Joining the project room requires a bound identity that is the project's
/// client or assigned developer.
pub fn check_join_room(
    project: &ProjectAccess,
    identity: Option<&Identity>,
) -> Result<(), CoreError> {
    match identity {
        Some(identity) if project.is_participant(identity.user_id) => Ok(()),
        _ => Err(CoreError::Forbidden(
            "Not authorized to join this project room".into(),
        )),
    }
}

/// Posting chat: the sender must be the client or developer of the project,
/// or the bound role must be admin.
pub fn check_post_chat(
    project: &ProjectAccess,
    sender_id: DbId,
    bound_role: Option<Role>,
) -> Result<(), CoreError> {
    if project.is_participant(sender_id) || bound_role == Some(Role::Admin) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Not authorized to post to this project".into(),
        ))
    }
}

/// Only the client role creates projects.
pub fn check_create(identity: &Identity) -> Result<(), CoreError> {
    if identity.role == Role::Client {
        Ok(())
    } else {
        Err(CoreError::Forbidden("Only clients can create projects".into()))
    }
}

/// Only the owner edits a project's descriptive fields.
pub fn check_edit(project: &ProjectAccess, identity: &Identity) -> Result<(), CoreError> {
    if project.is_client(identity.user_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Not authorized to edit this project".into(),
        ))
    }
}

/// Role gate for acceptance. The open/unassigned condition is enforced by
/// the store's conditional update, not here.
pub fn check_accept(identity: &Identity) -> Result<(), CoreError> {
    if identity.role == Role::Developer {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Only developers can accept projects".into(),
        ))
    }
}

/// Only the assigned developer posts timeline updates.
pub fn check_post_timeline(project: &ProjectAccess, identity: &Identity) -> Result<(), CoreError> {
    if project.is_developer(identity.user_id) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(
            "Not authorized to update timeline".into(),
        ))
    }
}

/// An assigned project never returns to `open`; that status is reserved for
/// projects still waiting on a developer.
pub fn check_timeline_target(
    project: &ProjectAccess,
    target: ProjectStatus,
) -> Result<(), CoreError> {
    if target == ProjectStatus::Open && project.developer_id.is_some() {
        return Err(CoreError::Validation(
            "An accepted project cannot be moved back to open".into(),
        ));
    }
    Ok(())
}

/// Owner-only request, allowed once a developer is assigned and the project
/// has left `open`. A pending request is never overwritten.
pub fn check_request_deletion(
    project: &ProjectAccess,
    identity: &Identity,
) -> Result<(), CoreError> {
    if !project.is_client(identity.user_id) {
        return Err(CoreError::Forbidden(
            "Not authorized to request deletion".into(),
        ));
    }
    if project.developer_id.is_none() || project.status == ProjectStatus::Open {
        return Err(CoreError::Validation(
            "Cannot request deletion for an unaccepted project".into(),
        ));
    }
    if project.deletion == Some(DeletionStatus::Requested) {
        return Err(CoreError::Conflict(
            "A deletion request is already pending for this project".into(),
        ));
    }
    Ok(())
}

/// Only the assigned developer approves, and only a pending request.
pub fn check_approve_deletion(
    project: &ProjectAccess,
    identity: &Identity,
) -> Result<(), CoreError> {
    if identity.role != Role::Developer {
        return Err(CoreError::Forbidden(
            "Only developers can approve deletion requests".into(),
        ));
    }
    if !project.is_developer(identity.user_id) {
        return Err(CoreError::Forbidden(
            "Not authorized to approve deletion for this project".into(),
        ));
    }
    if project.deletion != Some(DeletionStatus::Requested) {
        return Err(CoreError::Validation(
            "No active deletion request to approve".into(),
        ));
    }
    Ok(())
}

/// Owner-only immediate delete of a project nobody has accepted.
pub fn check_direct_delete(project: &ProjectAccess, identity: &Identity) -> Result<(), CoreError> {
    if !project.is_client(identity.user_id) {
        return Err(CoreError::Forbidden(
            "Not authorized to delete this project".into(),
        ));
    }
    if project.developer_id.is_some() || project.accepted || project.status != ProjectStatus::Open
    {
        return Err(CoreError::Validation(
            "Cannot delete a project that has been accepted by a developer. \
             Please request deletion and wait for developer approval."
                .into(),
        ));
    }
    Ok(())
}

/// Delete-for-everyone is allowed for the original sender or any developer.
pub fn can_delete_for_everyone(sender_id: DbId, identity: &Identity) -> bool {
    sender_id == identity.user_id || identity.role == Role::Developer
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn ids() -> (DbId, DbId, DbId) {
        (uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), uuid::Uuid::new_v4())
    }

    fn open_project(client: DbId) -> ProjectAccess {
        ProjectAccess {
            client_id: client,
            developer_id: None,
            status: ProjectStatus::Open,
            accepted: false,
            deletion: None,
        }
    }

    fn accepted_project(client: DbId, dev: DbId) -> ProjectAccess {
        ProjectAccess {
            client_id: client,
            developer_id: Some(dev),
            status: ProjectStatus::InProgress,
            accepted: true,
            deletion: None,
        }
    }

    #[test]
    fn view_allows_participants_and_admin() {
        let (client, dev, other) = ids();
        let project = accepted_project(client, dev);
        assert!(check_view(&project, &Identity::new(client, Role::Client)).is_ok());
        assert!(check_view(&project, &Identity::new(dev, Role::Developer)).is_ok());
        assert!(check_view(&project, &Identity::new(other, Role::Admin)).is_ok());
        assert_matches!(
            check_view(&project, &Identity::new(other, Role::Developer)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn join_requires_bound_participant_identity() {
        let (client, dev, other) = ids();
        let project = accepted_project(client, dev);
        assert!(check_join_room(&project, Some(&Identity::new(dev, Role::Developer))).is_ok());
        assert_matches!(check_join_room(&project, None), Err(CoreError::Forbidden(_)));
        assert_matches!(
            check_join_room(&project, Some(&Identity::new(other, Role::Admin))),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn chat_allows_admin_role_only_when_bound() {
        let (client, dev, other) = ids();
        let project = accepted_project(client, dev);
        assert!(check_post_chat(&project, client, None).is_ok());
        assert!(check_post_chat(&project, other, Some(Role::Admin)).is_ok());
        assert!(check_post_chat(&project, other, Some(Role::Developer)).is_err());
        assert!(check_post_chat(&project, other, None).is_err());
    }

    #[test]
    fn accepted_projects_cannot_reopen() {
        let (client, dev, _) = ids();
        let mut project = accepted_project(client, dev);
        project.deletion = Some(DeletionStatus::Requested);
        assert_matches!(
            check_timeline_target(&project, ProjectStatus::Open),
            Err(CoreError::Validation(_))
        );
        assert!(check_timeline_target(&project, ProjectStatus::Testing).is_ok());
        assert!(check_timeline_target(&project, ProjectStatus::Completed).is_ok());
    }

    #[test]
    fn only_developers_accept() {
        let (client, dev, _) = ids();
        assert!(check_accept(&Identity::new(dev, Role::Developer)).is_ok());
        assert_matches!(
            check_accept(&Identity::new(client, Role::Client)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn timeline_is_assigned_developer_only() {
        let (client, dev, other) = ids();
        let project = accepted_project(client, dev);
        assert!(check_post_timeline(&project, &Identity::new(dev, Role::Developer)).is_ok());
        assert!(check_post_timeline(&project, &Identity::new(client, Role::Client)).is_err());
        assert!(check_post_timeline(&project, &Identity::new(other, Role::Developer)).is_err());
    }

    #[test]
    fn deletion_request_rules() {
        let (client, dev, _) = ids();
        let owner = Identity::new(client, Role::Client);

        assert_matches!(
            check_request_deletion(&open_project(client), &owner),
            Err(CoreError::Validation(_))
        );

        let mut project = accepted_project(client, dev);
        assert!(check_request_deletion(&project, &owner).is_ok());
        assert_matches!(
            check_request_deletion(&project, &Identity::new(dev, Role::Developer)),
            Err(CoreError::Forbidden(_))
        );

        project.deletion = Some(DeletionStatus::Requested);
        assert_matches!(
            check_request_deletion(&project, &owner),
            Err(CoreError::Conflict(_))
        );

        project.deletion = Some(DeletionStatus::Cancelled);
        assert!(check_request_deletion(&project, &owner).is_ok());
    }

    #[test]
    fn approval_requires_pending_request_and_assigned_developer() {
        let (client, dev, other) = ids();
        let mut project = accepted_project(client, dev);
        let developer = Identity::new(dev, Role::Developer);

        assert_matches!(
            check_approve_deletion(&project, &developer),
            Err(CoreError::Validation(_))
        );

        project.deletion = Some(DeletionStatus::Requested);
        assert!(check_approve_deletion(&project, &developer).is_ok());
        assert_matches!(
            check_approve_deletion(&project, &Identity::new(other, Role::Developer)),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_approve_deletion(&project, &Identity::new(client, Role::Client)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn direct_delete_only_while_open_and_unassigned() {
        let (client, dev, other) = ids();
        let owner = Identity::new(client, Role::Client);
        assert!(check_direct_delete(&open_project(client), &owner).is_ok());
        assert_matches!(
            check_direct_delete(&open_project(client), &Identity::new(other, Role::Client)),
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            check_direct_delete(&accepted_project(client, dev), &owner),
            Err(CoreError::Validation(_))
        );

        // Moved back to open by a timeline update, but still assigned.
        let mut reopened = accepted_project(client, dev);
        reopened.status = ProjectStatus::Open;
        assert!(check_direct_delete(&reopened, &owner).is_err());
    }

    #[test]
    fn delete_for_everyone_sender_or_developer() {
        let (sender, dev, other) = ids();
        assert!(can_delete_for_everyone(sender, &Identity::new(sender, Role::Client)));
        assert!(can_delete_for_everyone(sender, &Identity::new(dev, Role::Developer)));
        assert!(!can_delete_for_everyone(sender, &Identity::new(other, Role::Client)));
        assert!(!can_delete_for_everyone(sender, &Identity::new(other, Role::Admin)));
    }
}
