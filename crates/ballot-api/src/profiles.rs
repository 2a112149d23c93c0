//! Candidate, polling-station and observer records. Reads are open to any
//! signed-in user; every mutation requires an admin.

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use ballot_bus::{
  candidates::{
    CreateCandidate, DeleteCandidate, GetCandidate, ListCandidates, UpdateCandidate,
  },
  observers::{CreateObserver, DeleteObserver, GetObserver, ListObservers, UpdateObserver},
  stations::{
    CreatePollingStation, DeletePollingStation, GetPollingStation, ListPollingStations,
    UpdatePollingStation,
  },
};
use ballot_core::{
  election::Candidate,
  id::{CandidateId, ElectionId, ObserverId, StationId},
  observer::{Observer, PollingStation},
  store::VotingStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path, Query},
};

// ─── Candidates ──────────────────────────────────────────────────────────────

/// `POST /candidates`
pub async fn create_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Json(body): Json<CreateCandidate>,
) -> Result<impl IntoResponse, ApiError> {
  let candidate = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(candidate)))
}

/// `GET /candidates/:id`
pub async fn get_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(candidate_id): Path<CandidateId>,
) -> Result<Json<Candidate>, ApiError> {
  Ok(Json(state.bus.ask(GetCandidate { candidate_id }).await?))
}

/// `GET /elections/:id/candidates`
pub async fn list_candidates<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
  Ok(Json(state.bus.ask(ListCandidates { election_id }).await?))
}

/// `PATCH /candidates/:id`
pub async fn update_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(candidate_id): Path<CandidateId>,
  Json(body): Json<UpdateCandidate>,
) -> Result<Json<Candidate>, ApiError> {
  let candidate = state
    .bus
    .execute(UpdateCandidate { candidate_id, ..body })
    .await?;
  Ok(Json(candidate))
}

/// `DELETE /candidates/:id`
pub async fn delete_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(candidate_id): Path<CandidateId>,
) -> Result<StatusCode, ApiError> {
  state.bus.execute(DeleteCandidate { candidate_id }).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Polling stations ────────────────────────────────────────────────────────

/// `POST /stations`
pub async fn create_station<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Json(body): Json<CreatePollingStation>,
) -> Result<impl IntoResponse, ApiError> {
  let station = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(station)))
}

/// `GET /stations/:id`
pub async fn get_station<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(station_id): Path<StationId>,
) -> Result<Json<PollingStation>, ApiError> {
  Ok(Json(state.bus.ask(GetPollingStation { station_id }).await?))
}

/// `GET /elections/:id/stations`
pub async fn list_stations<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<PollingStation>>, ApiError> {
  Ok(Json(state.bus.ask(ListPollingStations { election_id }).await?))
}

/// `PATCH /stations/:id`
pub async fn update_station<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(station_id): Path<StationId>,
  Json(body): Json<UpdatePollingStation>,
) -> Result<Json<PollingStation>, ApiError> {
  let station = state
    .bus
    .execute(UpdatePollingStation { station_id, ..body })
    .await?;
  Ok(Json(station))
}

/// `DELETE /stations/:id`
pub async fn delete_station<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(station_id): Path<StationId>,
) -> Result<StatusCode, ApiError> {
  state.bus.execute(DeletePollingStation { station_id }).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Observers ───────────────────────────────────────────────────────────────

/// `POST /observers`
pub async fn create_observer<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Json(body): Json<CreateObserver>,
) -> Result<impl IntoResponse, ApiError> {
  let observer = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(observer)))
}

/// `GET /observers/:id`
pub async fn get_observer<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(observer_id): Path<ObserverId>,
) -> Result<Json<Observer>, ApiError> {
  Ok(Json(state.bus.ask(GetObserver { observer_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct ObserverParams {
  pub election_id: Option<ElectionId>,
}

/// `GET /observers[?election_id=..]`
pub async fn list_observers<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<ObserverParams>,
) -> Result<Json<Vec<Observer>>, ApiError> {
  let observers = state
    .bus
    .ask(ListObservers { election_id: params.election_id })
    .await?;
  Ok(Json(observers))
}

/// `PATCH /observers/:id`
pub async fn update_observer<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(observer_id): Path<ObserverId>,
  Json(body): Json<UpdateObserver>,
) -> Result<Json<Observer>, ApiError> {
  let observer = state
    .bus
    .execute(UpdateObserver { observer_id, ..body })
    .await?;
  Ok(Json(observer))
}

/// `DELETE /observers/:id`
pub async fn delete_observer<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(observer_id): Path<ObserverId>,
) -> Result<StatusCode, ApiError> {
  state.bus.execute(DeleteObserver { observer_id }).await?;
  Ok(StatusCode::NO_CONTENT)
}
