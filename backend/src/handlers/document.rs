//! Document and folder HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::document::{
    CreateFolderInput, DocumentQuery, DocumentService, DocumentView, Folder, RegisterDocumentInput,
};
use crate::AppState;

fn service(state: &AppState) -> DocumentService {
    DocumentService::new(state.db.clone(), state.storage.clone())
}

// ============================================================================
// Folders
// ============================================================================

pub async fn list_folders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<Folder>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list_folders(condo_id).await?))
}

pub async fn create_folder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateFolderInput>,
) -> Result<(StatusCode, Json<Folder>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let folder = service(&state).create_folder(condo_id, input).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn delete_folder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, folder_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    service(&state).delete_folder(condo_id, folder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Documents
// ============================================================================

/// Documents the caller may see
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<DocumentView>>, AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list(condo_id, Some(role), &query).await?))
}

/// Register metadata of an uploaded object
pub async fn register_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<RegisterDocumentInput>,
) -> Result<(StatusCode, Json<DocumentView>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let document = service(&state).register(condo_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    service(&state).delete(condo_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Redirect to a short-lived signed URL. Public documents are open to any
/// signed-in user; everything else needs membership.
pub async fn download_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Redirect, AppError> {
    let role = state.members().role_of(condo_id, user.user_id).await?;
    let signed = service(&state)
        .download_url(condo_id, document_id, role)
        .await?;

    tracing::debug!(%document_id, user_id = %user.user_id, expires_at = %signed.expires_at, "download signed");
    Ok(Redirect::temporary(&signed.url))
}
