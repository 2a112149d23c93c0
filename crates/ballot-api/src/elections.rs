//! Handlers for `/elections` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/elections` | All elections |
//! | `POST` | `/elections` | Admin. Body: `{"name":..,"candidates":[..]}`; returns 201 |
//! | `GET`  | `/elections/summary` | Votes and turnout per election |
//! | `GET`  | `/elections/:id` | Single election with tallies |
//! | `POST` | `/elections/:id/end` | Admin. Marks the election completed |
//! | `GET`  | `/elections/:id/results` | `{candidate: votes}` in ballot order |
//! | `GET`  | `/elections/:id/export` | `?format=csv\|json` |
//! | `GET`  | `/elections/:id/audit-logs` | Admin |
//! | `POST` | `/elections/:id/audit-logs` | Admin. Body: `{"action":..,"details":..}` |

use axum::{
  extract::State,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use ballot_bus::{
  audit::{CreateAuditLog, ListAuditLogs},
  elections::{
    CandidateSupport, CandidateVotes, CreateElection, ElectionSummary, ElectionTurnout,
    ElectionsSummary, EndElection, ExportElectionResults, GetElection, GetElectionResults,
    ListElections, ParticipationByRole, ResultsBreakdown, RoleParticipation, TopCandidate,
    Turnout,
  },
  export::Export,
};
use ballot_core::{
  audit::AuditLog,
  election::{CandidateResult, Election, ElectionResults, Tally},
  id::ElectionId,
  store::VotingStore,
};
use serde::{Deserialize, Serialize};

use crate::{
  AppState,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path, Query},
};

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:       String,
  pub candidates: Vec<String>,
}

/// `POST /elections`
pub async fn create<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let election = state
    .bus
    .execute(CreateElection {
      actor:      admin.user_id,
      name:       body.name,
      candidates: body.candidates,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(election)))
}

/// `POST /elections/:id/end`
pub async fn end<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Election>, ApiError> {
  let election = state
    .bus
    .execute(EndElection { actor: admin.user_id, election_id })
    .await?;
  Ok(Json(election))
}

/// `GET /elections`
pub async fn list<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
) -> Result<Json<Vec<Election>>, ApiError> {
  Ok(Json(state.bus.ask(ListElections).await?))
}

/// `GET /elections/:id`
pub async fn get_one<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Election>, ApiError> {
  Ok(Json(state.bus.ask(GetElection { election_id }).await?))
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// `GET /elections/:id/results`
pub async fn results<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<ElectionResults>, ApiError> {
  Ok(Json(state.bus.ask(GetElectionResults { election_id }).await?))
}

/// `GET /elections/:id/breakdown`
pub async fn breakdown<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<CandidateResult>>, ApiError> {
  Ok(Json(state.bus.ask(ResultsBreakdown { election_id }).await?))
}

/// `GET /elections/:id/top-candidate`
pub async fn top_candidate<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Tally>, ApiError> {
  Ok(Json(state.bus.ask(TopCandidate { election_id }).await?))
}

/// `GET /elections/:id/support`
pub async fn support<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<CandidateVotes>>, ApiError> {
  Ok(Json(state.bus.ask(CandidateSupport { election_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
  #[serde(default = "default_format")]
  pub format: String,
}

fn default_format() -> String { "json".into() }

/// Render an export: CSV as an attachment named `filename`, JSON as a plain
/// body.
pub(crate) fn export_response<T: Serialize>(export: Export<T>, filename: &str) -> Response {
  match export {
    Export::Json(rows) => Json(rows).into_response(),
    Export::Csv(text) => {
      let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
      (
        [
          (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
          (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
      )
        .into_response()
    }
  }
}

/// `GET /elections/:id/export?format=csv|json`
pub async fn export<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
  Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
  let export = state
    .bus
    .ask(ExportElectionResults { election_id, format: params.format })
    .await?;
  Ok(export_response(export, &format!("election_{election_id}_results.csv")))
}

// ─── Turnout ─────────────────────────────────────────────────────────────────

/// `GET /elections/:id/turnout`
pub async fn turnout<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Turnout>, ApiError> {
  Ok(Json(state.bus.ask(ElectionTurnout { election_id }).await?))
}

/// `GET /elections/:id/participation`
pub async fn participation<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<RoleParticipation>>, ApiError> {
  Ok(Json(state.bus.ask(ParticipationByRole { election_id }).await?))
}

/// `GET /elections/summary`
pub async fn summary<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
) -> Result<Json<Vec<ElectionSummary>>, ApiError> {
  Ok(Json(state.bus.ask(ElectionsSummary).await?))
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// `GET /elections/:id/audit-logs`
pub async fn audit_logs<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(election_id): Path<ElectionId>,
) -> Result<Json<Vec<AuditLog>>, ApiError> {
  Ok(Json(state.bus.ask(ListAuditLogs { election_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct AuditBody {
  pub action:  String,
  pub details: Option<String>,
}

/// `POST /elections/:id/audit-logs`. The entry is attributed to the caller.
pub async fn append_audit_log<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(election_id): Path<ElectionId>,
  Json(body): Json<AuditBody>,
) -> Result<impl IntoResponse, ApiError> {
  let log = state
    .bus
    .execute(CreateAuditLog {
      election_id,
      performed_by: admin.user_id,
      action: body.action,
      details: body.details,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(log)))
}
