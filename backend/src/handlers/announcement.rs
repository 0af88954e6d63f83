//! Announcement HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::announcement::{
    Announcement, AnnouncementService, CreateAnnouncementInput, UpdateAnnouncementInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn service(state: &AppState) -> AnnouncementService {
    AnnouncementService::new(state.db.clone(), state.notifications())
}

pub async fn list_announcements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Announcement>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    let pagination = Pagination::from_query(query.page, query.per_page);
    Ok(Json(service(&state).list(condo_id, &pagination).await?))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, announcement_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Announcement>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).get(condo_id, announcement_id).await?))
}

/// Publish an announcement
pub async fn create_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateAnnouncementInput>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let announcement = service(&state).create(condo_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, announcement_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateAnnouncementInput>,
) -> Result<Json<Announcement>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    Ok(Json(service(&state).update(condo_id, announcement_id, input).await?))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, announcement_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    service(&state).delete(condo_id, announcement_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
