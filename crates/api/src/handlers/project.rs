//! Handlers for the `/projects` resource.
//!
//! Every transition goes through [`LifecycleEngine`](crate::engine::LifecycleEngine);
//! these functions only extract, parse, and wrap.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use easyweb_db::models::project::{
    CreateProject, DeletionRequestInput, Project, TimelineEntry, TimelineUpdate, UpdateProject,
};
use serde_json::{json, Value};

use super::path_id;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireClient, RequireDeveloper};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/projects
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    let project = state.lifecycle.create(&auth.identity(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = state
        .lifecycle
        .list(&auth.identity(), params.limit(), params.offset())
        .await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/open
pub async fn list_open(
    RequireDeveloper(_developer): RequireDeveloper,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    let projects = state.lifecycle.list_open().await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/count
pub async fn count(
    RequireClient(client): RequireClient,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Value>>> {
    let count = state.lifecycle.count_owned(&client.identity()).await?;
    Ok(Json(DataResponse {
        data: json!({ "count": count }),
    }))
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state.lifecycle.get(&auth.identity(), path_id(&id)?).await?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/v1/projects/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state
        .lifecycle
        .update(&auth.identity(), path_id(&id)?, input)
        .await?;
    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .lifecycle
        .direct_delete(&auth.identity(), path_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/projects/{id}/accept
pub async fn accept(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state.lifecycle.accept(&auth.identity(), path_id(&id)?).await?;
    Ok(Json(DataResponse { data: project }))
}

/// GET /api/v1/projects/{id}/timeline
pub async fn timeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<TimelineEntry>>>> {
    let timeline = state
        .lifecycle
        .timeline(&auth.identity(), path_id(&id)?)
        .await?;
    Ok(Json(DataResponse { data: timeline }))
}

/// PUT /api/v1/projects/{id}/timeline
pub async fn post_timeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TimelineUpdate>,
) -> AppResult<Json<DataResponse<Project>>> {
    let project = state
        .lifecycle
        .post_timeline(&auth.identity(), path_id(&id)?, input)
        .await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/projects/{id}/request-delete
///
/// The body is optional; an empty body means no reason.
pub async fn request_deletion(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: Option<Json<DeletionRequestInput>>,
) -> AppResult<Json<DataResponse<Project>>> {
    let reason = input.and_then(|Json(input)| input.reason);
    let project = state
        .lifecycle
        .request_deletion(&auth.identity(), path_id(&id)?, reason)
        .await?;
    Ok(Json(DataResponse { data: project }))
}

/// POST /api/v1/projects/{id}/approve-delete
pub async fn approve_deletion(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Value>>> {
    let (project, approval) = state
        .lifecycle
        .approve_deletion(&auth.identity(), path_id(&id)?)
        .await?;
    Ok(Json(DataResponse {
        data: json!({
            "message": "Project deleted",
            "projectId": project.id,
            "deletionRequest": approval,
        }),
    }))
}
