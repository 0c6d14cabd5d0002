//! Repository for the `projects` table.

use easyweb_core::status::ProjectStatus;
use easyweb_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::project::{
    CreateProject, DeletionRequest, Project, ProjectFilter, ProjectRow, TimelineEntry,
    UpdateProject,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, title, description, budget, deadline, attachments, contact_email, \
    contact_phone, client_id, developer_id, accepted_at, status, timeline, \
    deletion_request, created_at, updated_at";

/// Provides CRUD and conditional lifecycle updates for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new open, unassigned project owned by `client_id`.
    pub async fn create(
        pool: &PgPool,
        id: DbId,
        client_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects \
                (id, title, description, budget, deadline, attachments, \
                 contact_email, contact_phone, client_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.budget)
            .bind(input.deadline)
            .bind(&input.attachments)
            .bind(&input.contact_email)
            .bind(&input.contact_phone)
            .bind(client_id)
            .fetch_one(pool)
            .await?
            .try_into()
    }

    /// Find a project by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// List projects matching `filter`, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: ProjectFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let (condition, subject) = match filter {
            ProjectFilter::All => ("TRUE", None),
            ProjectFilter::OwnedBy(id) => ("client_id = $3", Some(id)),
            ProjectFilter::AssignedTo(id) => ("developer_id = $3", Some(id)),
            ProjectFilter::OpenUnassigned => ("status = 'open' AND developer_id IS NULL", None),
        };
        let query = format!(
            "SELECT {COLUMNS} FROM projects \
             WHERE {condition} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        let mut q = sqlx::query_as::<_, ProjectRow>(&query).bind(limit).bind(offset);
        if let Some(subject) = subject {
            q = q.bind(subject);
        }
        q.fetch_all(pool)
            .await?
            .into_iter()
            .map(Project::try_from)
            .collect()
    }

    /// Number of projects owned by `client_id`.
    pub async fn count_by_client(pool: &PgPool, client_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(pool)
            .await
    }

    /// Replace the descriptive fields. Returns `None` if no row with `id`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                title = $2, description = $3, budget = $4, deadline = $5, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.budget)
            .bind(input.deadline)
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// Assign `developer_id` if, and only if, the project is still open and
    /// unassigned. The check and the write are a single statement.
    ///
    /// Returns `None` when the condition did not hold (or the project does
    /// not exist); callers disambiguate with a follow-up read.
    pub async fn accept(
        pool: &PgPool,
        id: DbId,
        developer_id: DbId,
        entry: &TimelineEntry,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                developer_id = $2, \
                status = $3, \
                accepted_at = $4, \
                timeline = timeline || jsonb_build_array($5::jsonb), \
                updated_at = NOW() \
             WHERE id = $1 AND status = 'open' AND developer_id IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(developer_id)
            .bind(ProjectStatus::InProgress.as_str())
            .bind(entry.created_at)
            .bind(Json(entry))
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// Append a timeline entry, updating the status when one is supplied.
    pub async fn append_timeline(
        pool: &PgPool,
        id: DbId,
        entry: &TimelineEntry,
        status: Option<ProjectStatus>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                timeline = timeline || jsonb_build_array($2::jsonb), \
                status = COALESCE($3, status), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(Json(entry))
            .bind(status.map(ProjectStatus::as_str))
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// Record a deletion request unless one is already pending.
    pub async fn request_deletion(
        pool: &PgPool,
        id: DbId,
        request: &DeletionRequest,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET \
                deletion_request = $2::jsonb, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND developer_id IS NOT NULL \
               AND (deletion_request IS NULL \
                    OR deletion_request->>'status' <> 'requested') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .bind(Json(request))
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// Delete a project whose deletion request is still pending. Returns the
    /// deleted row. Chat messages go with it through the FK cascade.
    pub async fn delete_if_deletion_requested(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "DELETE FROM projects \
             WHERE id = $1 AND deletion_request->>'status' = 'requested' \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Project::try_from)
            .transpose()
    }

    /// Delete a project nobody has accepted yet.
    pub async fn delete_if_open(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM projects \
             WHERE id = $1 AND status = 'open' AND developer_id IS NULL \
               AND accepted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
