//! Member, functional title and roster HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::member::{
    AddMemberInput, AssignTitleInput, CreateTitleInput, FunctionalTitle, Member, RosterEntry,
    UpdateMemberInput,
};
use crate::AppState;

pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<Member>>, AppError> {
    let members = state.members();
    members.require_member(condo_id, user.user_id).await?;
    Ok(Json(members.list_members(condo_id).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<AddMemberInput>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    let member = members.add_member(condo_id, input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, member_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateMemberInput>,
) -> Result<Json<Member>, AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    Ok(Json(members.update_member(condo_id, member_id, input).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    members.remove_member(condo_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_title(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, member_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<AssignTitleInput>,
) -> Result<Json<Member>, AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    Ok(Json(members.assign_title(condo_id, member_id, input).await?))
}

// ============================================================================
// Functional titles
// ============================================================================

pub async fn list_titles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<FunctionalTitle>>, AppError> {
    let members = state.members();
    members.require_member(condo_id, user.user_id).await?;
    Ok(Json(members.list_titles(condo_id).await?))
}

pub async fn create_title(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateTitleInput>,
) -> Result<(StatusCode, Json<FunctionalTitle>), AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    let title = members.create_title(condo_id, input).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn delete_title(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, title_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let members = state.members();
    members.require_admin(condo_id, user.user_id).await?;
    members.delete_title(condo_id, title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Governance roster
pub async fn roster(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<RosterEntry>>, AppError> {
    let members = state.members();
    members.require_member(condo_id, user.user_id).await?;
    Ok(Json(members.roster(condo_id).await?))
}
