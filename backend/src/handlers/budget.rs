//! Budget HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::budget::{BudgetItem, BudgetService, CreateBudgetItemInput, UpdateBudgetItemInput};
use crate::services::export::CsvExport;
use crate::AppState;
use shared::BudgetSummary;

/// Query parameters selecting a fiscal year, the current one by default
#[derive(Debug, Deserialize)]
pub struct FiscalYearQuery {
    pub year: Option<i32>,
}

impl FiscalYearQuery {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

pub async fn list_budget_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<FiscalYearQuery>,
) -> Result<Json<Vec<BudgetItem>>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    Ok(Json(service.list(condo_id, query.year()).await?))
}

pub async fn create_budget_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateBudgetItemInput>,
) -> Result<(StatusCode, Json<BudgetItem>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    let item = service.create(condo_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_budget_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateBudgetItemInput>,
) -> Result<Json<BudgetItem>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    Ok(Json(service.update(condo_id, item_id, input).await?))
}

pub async fn delete_budget_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    service.delete(condo_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Per-category totals of a fiscal year
pub async fn budget_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<FiscalYearQuery>,
) -> Result<Json<BudgetSummary>, AppError> {
    state.members().require_member(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    Ok(Json(service.summary(condo_id, query.year()).await?))
}

pub async fn export_budget(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Query(query): Query<FiscalYearQuery>,
) -> Result<CsvExport, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;

    let service = BudgetService::new(state.db.clone());
    service.export(condo_id, query.year()).await
}
