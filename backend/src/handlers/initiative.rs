//! Initiative HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::initiative::{
    DecideInitiativeInput, Initiative, InitiativeService, ProposeInitiativeInput,
};
use crate::services::project::Project;
use crate::AppState;

pub async fn list_initiatives(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<Initiative>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    Ok(Json(service.list(condo_id, user.user_id).await?))
}

pub async fn get_initiative(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, initiative_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Initiative>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    Ok(Json(service.get(condo_id, initiative_id, user.user_id).await?))
}

pub async fn propose_initiative(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<ProposeInitiativeInput>,
) -> Result<(StatusCode, Json<Initiative>), AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    let initiative = service.propose(condo_id, user.user_id, role, input).await?;
    Ok((StatusCode::CREATED, Json(initiative)))
}

pub async fn support_initiative(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, initiative_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Initiative>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    Ok(Json(service.support(condo_id, initiative_id, user.user_id).await?))
}

pub async fn withdraw_support(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, initiative_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Initiative>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    Ok(Json(service.withdraw(condo_id, initiative_id, user.user_id).await?))
}

pub async fn decide_initiative(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, initiative_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<DecideInitiativeInput>,
) -> Result<Json<Initiative>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    Ok(Json(service.decide(condo_id, initiative_id, user.user_id, input).await?))
}

/// Turn an accepted initiative into a project
pub async fn promote_initiative(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, initiative_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = InitiativeService::new(state.db.clone());
    let project = service.promote(condo_id, initiative_id, user.user_id).await?;
    Ok((StatusCode::CREATED, Json(project)))
}
