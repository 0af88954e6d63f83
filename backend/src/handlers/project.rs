//! Project HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::project::{
    CreateProjectInput, PostUpdateInput, Project, ProjectDetail, ProjectService, ProjectUpdate,
};
use crate::AppState;

fn service(state: &AppState) -> ProjectService {
    ProjectService::new(state.db.clone(), state.notifications())
}

pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<Project>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list(condo_id).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProjectDetail>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).get(condo_id, project_id).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let project = service(&state).create(condo_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Move a project to its next status
pub async fn advance_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Project>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    Ok(Json(service(&state).advance(condo_id, project_id).await?))
}

pub async fn list_project_updates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<ProjectUpdate>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list_updates(condo_id, project_id).await?))
}

pub async fn post_project_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, project_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<PostUpdateInput>,
) -> Result<(StatusCode, Json<ProjectUpdate>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let update = service(&state)
        .post_update(condo_id, project_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(update)))
}
