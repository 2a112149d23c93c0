//! Handlers for voter endpoints.

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use ballot_bus::voters::{
  BulkRegisterVoters, BulkRegistration, GetVoter, GetVoterByUser, HasVoted, HasVotedStatus,
  ListInactiveVoters, RegisterVoter, VotingStatus,
};
use ballot_core::{
  id::{UserId, VoterId},
  store::VotingStore,
  user::{Voter, VoterProfile},
};

use crate::{
  AppState,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path},
};

/// `POST /voters`. Public; returns 201 with the new voter and its user.
pub async fn register<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterVoter>,
) -> Result<impl IntoResponse, ApiError> {
  let profile = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `POST /voters/bulk`. Body: `{"voters":[{"name":..,"email":..,"role":..}]}`
pub async fn bulk_register<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Json(body): Json<BulkRegisterVoters>,
) -> Result<Json<BulkRegistration>, ApiError> {
  Ok(Json(state.bus.execute(body).await?))
}

/// `GET /voters/status`
pub async fn status<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<VoterProfile>>, ApiError> {
  Ok(Json(state.bus.ask(VotingStatus).await?))
}

/// `GET /voters/inactive`
pub async fn inactive<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<Vec<VoterProfile>>, ApiError> {
  Ok(Json(state.bus.ask(ListInactiveVoters).await?))
}

/// `GET /voters/:id`
pub async fn get_one<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(voter_id): Path<VoterId>,
) -> Result<Json<Voter>, ApiError> {
  let voter = state.bus.ask(GetVoter { voter_id }).await?;
  caller.require_self_or_admin(voter.user_id)?;
  Ok(Json(voter))
}

/// `GET /users/:id/voter`
pub async fn by_user<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<Voter>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(GetVoterByUser { user_id }).await?))
}

/// `GET /users/:id/has-voted`
pub async fn has_voted<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<HasVotedStatus>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(HasVoted { user_id }).await?))
}
