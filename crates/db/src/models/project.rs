//! Project entity model and DTOs.

use easyweb_core::lifecycle::{DeletionStatus, ProjectAccess};
use easyweb_core::roles::ParticipantKind;
use easyweb_core::status::ProjectStatus;
use easyweb_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// One immutable entry on a project's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: ProjectStatus,
    pub message: String,
    pub by: DbId,
    pub by_kind: ParticipantKind,
    pub created_at: Timestamp,
}

impl TimelineEntry {
    pub fn new(
        status: ProjectStatus,
        message: impl Into<String>,
        by: DbId,
        by_kind: ParticipantKind,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            by,
            by_kind,
            created_at: chrono::Utc::now(),
        }
    }
}

/// The single-slot deletion workflow record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequest {
    pub requested_by: DbId,
    pub requested_at: Timestamp,
    pub status: DeletionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub approved_by: Option<DbId>,
    #[serde(default)]
    pub approved_by_kind: Option<ParticipantKind>,
    #[serde(default)]
    pub approved_at: Option<Timestamp>,
}

impl DeletionRequest {
    pub fn requested(requested_by: DbId, reason: Option<String>) -> Self {
        Self {
            requested_by,
            requested_at: chrono::Utc::now(),
            status: DeletionStatus::Requested,
            reason,
            approved_by: None,
            approved_by_kind: None,
            approved_at: None,
        }
    }
}

/// A project as seen by the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub deadline: Timestamp,
    pub attachments: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub client_id: DbId,
    pub developer_id: Option<DbId>,
    pub accepted_at: Option<Timestamp>,
    pub status: ProjectStatus,
    pub timeline: Vec<TimelineEntry>,
    pub deletion_request: Option<DeletionRequest>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Snapshot of the fields lifecycle rules look at.
    pub fn access(&self) -> ProjectAccess {
        ProjectAccess {
            client_id: self.client_id,
            developer_id: self.developer_id,
            status: self.status,
            accepted: self.accepted_at.is_some(),
            deletion: self.deletion_request.as_ref().map(|r| r.status),
        }
    }

    /// Most recently appended timeline entry.
    pub fn last_entry(&self) -> Option<&TimelineEntry> {
        self.timeline.last()
    }
}

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectRow {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub budget: f64,
    pub deadline: Timestamp,
    pub attachments: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub client_id: DbId,
    pub developer_id: Option<DbId>,
    pub accepted_at: Option<Timestamp>,
    pub status: String,
    pub timeline: Json<Vec<TimelineEntry>>,
    pub deletion_request: Option<Json<DeletionRequest>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ProjectRow> for Project {
    type Error = sqlx::Error;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<ProjectStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Project {
            id: row.id,
            title: row.title,
            description: row.description,
            budget: row.budget,
            deadline: row.deadline,
            attachments: row.attachments,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            client_id: row.client_id,
            developer_id: row.developer_id,
            accepted_at: row.accepted_at,
            status,
            timeline: row.timeline.0,
            deletion_request: row.deletion_request.map(|json| json.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "budget must be a positive number"))]
    pub budget: f64,
    pub deadline: Timestamp,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[validate(email(message = "contactEmail must be a valid email address"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl CreateProject {
    /// Trim free-text fields the way they are stored.
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.contact_email = trim_optional(self.contact_email);
        self.contact_phone = trim_optional(self.contact_phone);
        self
    }
}

/// DTO for editing a project. The owner must resend every field.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "budget must be a positive number"))]
    pub budget: f64,
    pub deadline: Timestamp,
}

impl UpdateProject {
    pub fn trimmed(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self
    }
}

/// Body of `PUT /projects/{id}/timeline`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /projects/{id}/request-delete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeletionRequestInput {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Which projects a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    OwnedBy(DbId),
    AssignedTo(DbId),
    OpenUnassigned,
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
