//! Notification HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::notification::{ListNotificationsQuery, Notification};
use crate::AppState;

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: i64,
}

/// The caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.notifications().list(user.user_id, &query).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = state.notifications().unread_count(user.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .notifications()
        .mark_read(user.user_id, notification_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = state.notifications().mark_all_read(user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
