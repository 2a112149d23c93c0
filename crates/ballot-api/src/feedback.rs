//! Observer feedback and integrity reporting.

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use ballot_bus::feedback::{
  DailyCount, ExportFeedback, FeedbackTimePatterns, IntegrityReport, IntegrityScore,
  ListFeedback, ObserverReliability, ObserverReports, ObserverTrust, SeverityDistribution,
  SubmitFeedback, TopObservers,
};
use ballot_core::{
  analytics::SeverityCounts,
  id::{ElectionId, ObserverId},
  observer::{ObserverFeedback, Severity},
  store::VotingStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::CurrentUser,
  elections::export_response,
  error::ApiError,
  extract::{Json, Path, Query},
  parse_param, parse_value,
};

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub observer_id: ObserverId,
  pub election_id: ElectionId,
  pub description: String,
  /// `LOW`, `MEDIUM` or `HIGH`.
  pub severity:    String,
}

/// `POST /feedback`
pub async fn submit<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError> {
  let severity: Severity = parse_value(&body.severity, "severity")?;
  let feedback = state
    .bus
    .execute(SubmitFeedback {
      observer_id: body.observer_id,
      election_id: body.election_id,
      description: body.description,
      severity,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(feedback)))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackParams {
  pub election_id: Option<ElectionId>,
  pub observer_id: Option<ObserverId>,
  pub severity:    Option<String>,
}

/// `GET /feedback[?election_id=..][&observer_id=..][&severity=..]`
pub async fn list<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<FeedbackParams>,
) -> Result<Json<Vec<ObserverFeedback>>, ApiError> {
  let severity = parse_param::<Severity>(params.severity.as_deref(), "severity")?;
  let feedback = state
    .bus
    .ask(ListFeedback {
      election_id: params.election_id,
      observer_id: params.observer_id,
      severity,
    })
    .await?;
  Ok(Json(feedback))
}

/// `GET /elections/:id/integrity`
pub async fn integrity<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<IntegrityReport>, ApiError> {
  Ok(Json(state.bus.ask(IntegrityScore { election_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct ElectionScope {
  pub election_id: Option<ElectionId>,
}

/// `GET /feedback/severity[?election_id=..]`
pub async fn severity<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(scope): Query<ElectionScope>,
) -> Result<Json<SeverityCounts>, ApiError> {
  Ok(Json(
    state
      .bus
      .ask(SeverityDistribution { election_id: scope.election_id })
      .await?,
  ))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

/// `GET /feedback/top-observers[?limit=10]`
pub async fn top_observers<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<ObserverReports>>, ApiError> {
  Ok(Json(state.bus.ask(TopObservers { limit: params.limit }).await?))
}

/// `GET /feedback/time-patterns[?election_id=..]`
pub async fn time_patterns<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(scope): Query<ElectionScope>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
  Ok(Json(
    state
      .bus
      .ask(FeedbackTimePatterns { election_id: scope.election_id })
      .await?,
  ))
}

/// `GET /feedback/reliability[?election_id=..]`
pub async fn reliability<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(scope): Query<ElectionScope>,
) -> Result<Json<Vec<ObserverTrust>>, ApiError> {
  Ok(Json(
    state
      .bus
      .ask(ObserverReliability { election_id: scope.election_id })
      .await?,
  ))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  pub election_id: Option<ElectionId>,
  #[serde(default = "default_format")]
  pub format:      String,
}

fn default_format() -> String { "json".into() }

/// `GET /feedback/export[?election_id=..][&format=csv|json]`
pub async fn export<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
  let filename = match params.election_id {
    Some(id) => format!("election_{id}_feedback.csv"),
    None => "feedback.csv".to_owned(),
  };
  let export = state
    .bus
    .ask(ExportFeedback { election_id: params.election_id, format: params.format })
    .await?;
  Ok(export_response(export, &filename))
}
