//! Room-addressed lifecycle notifications.
//!
//! Notification delivery is never part of an operation's success contract:
//! the primary write has already committed when these run, so failures are
//! logged and swallowed.

use std::sync::Arc;

use easyweb_core::protocol::{server_events, ServerFrame};
use easyweb_core::rooms::Room;
use easyweb_core::types::{DbId, Timestamp};
use easyweb_db::models::project::{DeletionRequest, Project, TimelineEntry};
use easyweb_db::models::user::UserSummary;
use serde::Serialize;
use serde_json::json;

use crate::ws::RoomHub;

/// Pushes lifecycle events into the room directory.
#[derive(Clone)]
pub struct Notifier {
    hub: Arc<RoomHub>,
}

impl Notifier {
    pub fn new(hub: Arc<RoomHub>) -> Self {
        Self { hub }
    }

    /// `send(roomId, eventName, payload)`.
    pub async fn send<T: Serialize>(&self, room: Room, event: &str, payload: &T) -> usize {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, event, room = %room, "Failed to encode notification");
                return 0;
            }
        };
        let delivered = self.hub.send_to_room(room, &ServerFrame::new(event, data)).await;
        tracing::debug!(event, room = %room, delivered, "Notification sent");
        delivered
    }

    /// Like [`Notifier::send`] across several rooms; a connection that sits
    /// in more than one of them gets a single frame.
    pub async fn send_many<T: Serialize>(&self, rooms: &[Room], event: &str, payload: &T) -> usize {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, event, "Failed to encode notification");
                return 0;
            }
        };
        let delivered = self.hub.send_to_rooms(rooms, &ServerFrame::new(event, data)).await;
        tracing::debug!(event, rooms = rooms.len(), delivered, "Notification sent");
        delivered
    }

    pub async fn project_created(&self, project: &Project) {
        self.send(
            Room::Developers,
            server_events::PROJECT_CREATED,
            &json!({ "project": project }),
        )
        .await;
    }

    pub async fn project_accepted(&self, project: &Project, developer: &DeveloperCard) {
        self.send(
            Room::Project(project.id),
            server_events::PROJECT_ACCEPTED,
            &json!({
                "projectId": project.id,
                "projectTitle": project.title,
                "developer": developer,
            }),
        )
        .await;
    }

    pub async fn timeline_updated(&self, project: &Project, entry: &TimelineEntry) {
        self.send(
            Room::Project(project.id),
            server_events::TIMELINE_UPDATE,
            &json!({
                "projectId": project.id,
                "projectTitle": project.title,
                "entry": entry,
                "timeline": project.timeline,
            }),
        )
        .await;
    }

    /// Fan out to the assigned developer's personal room and the shared
    /// developers room; each connection gets one copy.
    pub async fn deletion_requested(
        &self,
        project: &Project,
        request: &DeletionRequest,
        client_name: Option<&str>,
    ) {
        let Some(developer_id) = project.developer_id else {
            tracing::warn!(project_id = %project.id, "Deletion request without developer");
            return;
        };
        let payload = json!({
            "projectId": project.id,
            "projectTitle": project.title,
            "requestedAt": request.requested_at,
            "clientId": project.client_id,
            "clientName": client_name,
            "reason": request.reason,
            "project": project,
        });
        self.send_many(
            &[Room::Personal(developer_id), Room::Developers],
            server_events::PROJECT_DELETION_REQUESTED,
            &payload,
        )
        .await;
    }

    pub async fn deletion_approved(&self, project: &Project, approval: &DeletionRequest) {
        let payload = json!({
            "projectId": project.id,
            "projectTitle": project.title,
            "approvedBy": approval.approved_by,
            "approvedAt": approval.approved_at,
        });
        let mut rooms = vec![Room::Personal(project.client_id)];
        rooms.extend(project.developer_id.map(Room::Personal));
        rooms.push(Room::Developers);
        self.send_many(&rooms, server_events::PROJECT_DELETION_APPROVED, &payload)
            .await;
    }
}

/// Developer display data carried by `project:accepted`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperCard {
    pub id: DbId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub accepted_at: Option<Timestamp>,
}

impl DeveloperCard {
    pub fn new(id: DbId, summary: Option<&UserSummary>, accepted_at: Option<Timestamp>) -> Self {
        Self {
            id,
            name: summary.map(|u| u.name.clone()),
            email: summary.and_then(|u| u.email.clone()),
            accepted_at,
        }
    }
}
