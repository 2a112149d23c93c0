//! Vote casting and vote analytics.

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use ballot_bus::{
  ballots::{
    CandidateDistribution, CandidateShare, CastVote, CastVoteForCandidate, ConfidenceForecast,
    ElectionVotingSummary, ListVotes, PeriodCount, PredictTurnout, TurnoutConfidence,
    TurnoutForecast, TurnoutTrend, TurnoutTrends, VotingPatterns, VotingSummary,
  },
  voters::GetVoter,
};
use ballot_core::{
  Error,
  analytics::TimeBucket,
  election::Vote,
  id::{ElectionId, VoterId},
  store::VotingStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path, Query},
  parse_param, parse_value,
};

/// Voters may only cast their own ballot. Admins may cast on behalf of any
/// voter.
async fn require_own_ballot<S: VotingStore + 'static>(
  state: &AppState<S>,
  caller: &CurrentUser,
  voter_id: VoterId,
) -> Result<(), ApiError> {
  let voter = state.bus.ask(GetVoter { voter_id }).await?;
  if voter.user_id != caller.0.user_id && !caller.0.is_admin() {
    tracing::warn!(
      user_id = %caller.0.user_id,
      voter_id = %voter_id,
      "ballot cast for another voter refused"
    );
    return Err(Error::Forbidden("You can only cast your own vote.".into()).into());
  }
  Ok(())
}

/// `POST /votes`. Body: `{"voter_id":..,"election_id":..,"candidate":".."}`
pub async fn cast<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Json(body): Json<CastVote>,
) -> Result<impl IntoResponse, ApiError> {
  require_own_ballot(&state, &caller, body.voter_id).await?;
  let result = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(result)))
}

/// `POST /votes/by-candidate`. Body:
/// `{"voter_id":..,"election_id":..,"candidate_id":..}`
pub async fn cast_for_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Json(body): Json<CastVoteForCandidate>,
) -> Result<impl IntoResponse, ApiError> {
  require_own_ballot(&state, &caller, body.voter_id).await?;
  let result = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct VoteParams {
  pub election_id: Option<ElectionId>,
  pub voter_id:    Option<VoterId>,
}

/// `GET /votes[?election_id=..][&voter_id=..]`
pub async fn list<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Query(params): Query<VoteParams>,
) -> Result<Json<Vec<Vote>>, ApiError> {
  let votes = state
    .bus
    .ask(ListVotes { election_id: params.election_id, voter_id: params.voter_id })
    .await?;
  Ok(Json(votes))
}

// ─── Analytics ───────────────────────────────────────────────────────────────

/// `GET /elections/:id/distribution`
pub async fn distribution<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<CandidateShare>>, ApiError> {
  Ok(Json(state.bus.ask(CandidateDistribution { election_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct PatternParams {
  pub interval: Option<String>,
}

/// `GET /elections/:id/patterns[?interval=hourly|daily]`
pub async fn patterns<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
  Query(params): Query<PatternParams>,
) -> Result<Json<Vec<PeriodCount>>, ApiError> {
  let interval =
    parse_param::<TimeBucket>(params.interval.as_deref(), "interval")?.unwrap_or_default();
  Ok(Json(state.bus.ask(VotingPatterns { election_id, interval }).await?))
}

#[derive(Debug, Deserialize)]
pub struct TrendParams {
  /// Comma separated, e.g. `1,2,3`.
  pub election_ids: String,
}

/// `GET /analytics/turnout-trends?election_ids=1,2,3`
pub async fn trends<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<TrendParams>,
) -> Result<Json<Vec<TurnoutTrend>>, ApiError> {
  let election_ids = params
    .election_ids
    .split(',')
    .map(str::trim)
    .filter(|raw| !raw.is_empty())
    .map(|raw| parse_value::<i64>(raw, "election id").map(ElectionId))
    .collect::<Result<Vec<_>, _>>()?;
  Ok(Json(state.bus.ask(TurnoutTrends { election_ids }).await?))
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
  pub lookback: Option<usize>,
}

/// `GET /elections/:id/forecast[?lookback=3]`
pub async fn forecast<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
  Query(params): Query<ForecastParams>,
) -> Result<Json<TurnoutForecast>, ApiError> {
  let forecast = state
    .bus
    .ask(PredictTurnout { election_id, lookback: params.lookback })
    .await?;
  Ok(Json(forecast))
}

/// `GET /elections/:id/forecast/confidence[?lookback=5]`
pub async fn confidence<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
  Query(params): Query<ForecastParams>,
) -> Result<Json<ConfidenceForecast>, ApiError> {
  let forecast = state
    .bus
    .ask(TurnoutConfidence { election_id, lookback: params.lookback })
    .await?;
  Ok(Json(forecast))
}

/// `GET /elections/:id/voting-summary`
pub async fn summary<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<ElectionVotingSummary>, ApiError> {
  Ok(Json(state.bus.ask(VotingSummary { election_id }).await?))
}
