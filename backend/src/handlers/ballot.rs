//! Ballot and voting HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::ballot::{
    Ballot, BallotDetail, BallotListItem, BallotService, CastVoteInput, CreateBallotInput,
    ResultsView,
};
use crate::services::export::CsvExport;
use crate::AppState;

fn service(state: &AppState) -> BallotService {
    BallotService::new(state.db.clone(), state.notifications())
}

pub async fn list_ballots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
) -> Result<Json<Vec<BallotListItem>>, AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).list(condo_id, user.user_id, role).await?))
}

pub async fn get_ballot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BallotDetail>, AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;
    let ballot = service(&state)
        .get_visible(condo_id, ballot_id, user.user_id, role)
        .await?;
    Ok(Json(ballot))
}

/// Create a draft ballot
pub async fn create_ballot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(condo_id): Path<Uuid>,
    Json(input): Json<CreateBallotInput>,
) -> Result<(StatusCode, Json<BallotDetail>), AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    let ballot = service(&state).create(condo_id, user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(ballot)))
}

pub async fn open_ballot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ballot>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    Ok(Json(service(&state).open(condo_id, ballot_id).await?))
}

pub async fn close_ballot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Ballot>, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    Ok(Json(service(&state).close(condo_id, ballot_id).await?))
}

/// Cast the caller's vote
pub async fn cast_vote(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CastVoteInput>,
) -> Result<(StatusCode, Json<BallotDetail>), AppError> {
    state.members().require_member(condo_id, user.user_id).await?;
    let ballot = service(&state)
        .vote(condo_id, ballot_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(ballot)))
}

pub async fn ballot_results(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ResultsView>, AppError> {
    let role = state.members().require_member(condo_id, user.user_id).await?;
    Ok(Json(service(&state).results(condo_id, ballot_id, role).await?))
}

/// Votes as CSV
pub async fn export_ballot(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((condo_id, ballot_id)): Path<(Uuid, Uuid)>,
) -> Result<CsvExport, AppError> {
    state.members().require_admin(condo_id, user.user_id).await?;
    service(&state).export_votes(condo_id, ballot_id).await
}
