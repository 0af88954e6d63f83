//! Condominium and settings HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::condominium::{
    Condominium, CondominiumService, CondominiumSettings, CreateCondominiumInput, MyCondominium,
    UpdateCondominiumInput, UpdateSettingsInput,
};
use crate::AppState;

/// Condominiums the caller belongs to
pub async fn list_condominiums(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<MyCondominium>>, AppError> {
    let service = CondominiumService::new(state.db.clone());
    Ok(Json(service.list_for_user(user.user_id).await?))
}

/// Create a condominium; the caller becomes its admin
pub async fn create_condominium(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCondominiumInput>,
) -> Result<(StatusCode, Json<Condominium>), AppError> {
    let service = CondominiumService::new(state.db.clone());
    let condominium = service.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(condominium)))
}

pub async fn get_condominium(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Condominium>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = CondominiumService::new(state.db.clone());
    Ok(Json(service.get(condo_id).await?))
}

pub async fn update_condominium(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<UpdateCondominiumInput>,
) -> Result<Json<Condominium>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = CondominiumService::new(state.db.clone());
    Ok(Json(service.update(condo_id, input).await?))
}

pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<CondominiumSettings>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = CondominiumService::new(state.db.clone());
    Ok(Json(service.settings(condo_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<UpdateSettingsInput>,
) -> Result<Json<CondominiumSettings>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = CondominiumService::new(state.db.clone());
    let settings = service.update_settings(condo_id, input).await?;
    tracing::info!(condominium_id = %condo_id, user_id = %user.user_id, "settings updated");
    Ok(Json(settings))
}
