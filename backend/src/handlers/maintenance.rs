//! Maintenance request HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::maintenance::{
    CreateMaintenanceInput, MaintenanceQuery, MaintenanceRequest, MaintenanceService,
    UpdateMaintenanceInput,
};
use crate::AppState;

fn service(state: &AppState) -> MaintenanceService {
    MaintenanceService::new(state.db.clone(), state.notifications())
}

pub async fn list_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<MaintenanceQuery>,
) -> Result<Json<Vec<MaintenanceRequest>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list(condo_id, &query).await?))
}

pub async fn get_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, request_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MaintenanceRequest>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).get(condo_id, request_id).await?))
}

/// Report a problem
pub async fn create_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateMaintenanceInput>,
) -> Result<(StatusCode, Json<MaintenanceRequest>), AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    let request = service(&state).create(condo_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Change status, priority or assignee
pub async fn update_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, request_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateMaintenanceInput>,
) -> Result<Json<MaintenanceRequest>, AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;
    let request = service(&state)
        .update(condo_id, request_id, user.user_id, role, input)
        .await?;
    Ok(Json(request))
}
