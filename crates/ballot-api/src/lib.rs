//! JSON REST and WebSocket API for Ballot.
//!
//! Exposes an axum [`Router`] over a shared [`Bus`]. Every route parses its
//! input into one request type, sends it through the bus, and serialises the
//! result. TLS and listening are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(Arc::new(Bus::new(store)));
//! let app = Router::new().nest("/api", ballot_api::api_router(state));
//! ```

pub mod alerts;
pub mod auth;
pub mod elections;
pub mod error;
pub mod extract;
pub mod feedback;
pub mod live;
pub mod profiles;
pub mod users;
pub mod voters;
pub mod votes;

use std::{str::FromStr, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use ballot_bus::Bus;
use ballot_core::{Error, store::VotingStore};
use tokio::sync::broadcast;

pub use error::ApiError;
pub use live::LiveEvent;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub bus:  Arc<Bus<S>>,
  /// Fan-out to connected WebSocket clients.
  pub live: broadcast::Sender<LiveEvent>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { bus: self.bus.clone(), live: self.live.clone() }
  }
}

impl<S: VotingStore> AppState<S> {
  pub fn new(bus: Arc<Bus<S>>) -> Self {
    let (live, _) = broadcast::channel(256);
    Self { bus, live }
  }

  /// Publish to live subscribers. Having no subscribers is not an error.
  pub(crate) fn publish(&self, event: LiveEvent) { let _ = self.live.send(event); }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: VotingStore + 'static,
{
  Router::new()
    .route("/health", get(|| async { "ok" }))
    // Accounts
    .route("/auth/signup", post(users::sign_up::<S>))
    .route("/users", get(users::list::<S>))
    .route("/users/me", get(users::me::<S>))
    .route("/users/stats", get(users::statistics::<S>))
    .route("/users/{id}", get(users::get_one::<S>).patch(users::update::<S>))
    .route("/users/{id}/role", put(users::change_role::<S>))
    .route("/users/{id}/voter", get(voters::by_user::<S>))
    .route("/users/{id}/has-voted", get(voters::has_voted::<S>))
    .route("/admins", get(users::admins::<S>))
    // Voters
    .route("/voters", post(voters::register::<S>))
    .route("/voters/bulk", post(voters::bulk_register::<S>))
    .route("/voters/status", get(voters::status::<S>))
    .route("/voters/inactive", get(voters::inactive::<S>))
    .route("/voters/{id}", get(voters::get_one::<S>))
    // Elections
    .route("/elections", get(elections::list::<S>).post(elections::create::<S>))
    .route("/elections/summary", get(elections::summary::<S>))
    .route("/elections/{id}", get(elections::get_one::<S>))
    .route("/elections/{id}/end", post(elections::end::<S>))
    .route("/elections/{id}/results", get(elections::results::<S>))
    .route("/elections/{id}/breakdown", get(elections::breakdown::<S>))
    .route("/elections/{id}/top-candidate", get(elections::top_candidate::<S>))
    .route("/elections/{id}/support", get(elections::support::<S>))
    .route("/elections/{id}/export", get(elections::export::<S>))
    .route("/elections/{id}/turnout", get(elections::turnout::<S>))
    .route("/elections/{id}/participation", get(elections::participation::<S>))
    .route(
      "/elections/{id}/audit-logs",
      get(elections::audit_logs::<S>).post(elections::append_audit_log::<S>),
    )
    .route("/elections/{id}/candidates", get(profiles::list_candidates::<S>))
    .route("/elections/{id}/stations", get(profiles::list_stations::<S>))
    .route("/elections/{id}/integrity", get(feedback::integrity::<S>))
    // Votes and analytics
    .route("/votes", get(votes::list::<S>).post(votes::cast::<S>))
    .route("/votes/by-candidate", post(votes::cast_for_candidate::<S>))
    .route("/elections/{id}/distribution", get(votes::distribution::<S>))
    .route("/elections/{id}/patterns", get(votes::patterns::<S>))
    .route("/elections/{id}/forecast", get(votes::forecast::<S>))
    .route("/elections/{id}/forecast/confidence", get(votes::confidence::<S>))
    .route("/elections/{id}/voting-summary", get(votes::summary::<S>))
    .route("/analytics/turnout-trends", get(votes::trends::<S>))
    // Candidates, stations, observers
    .route("/candidates", post(profiles::create_candidate::<S>))
    .route(
      "/candidates/{id}",
      get(profiles::get_candidate::<S>)
        .patch(profiles::update_candidate::<S>)
        .delete(profiles::delete_candidate::<S>),
    )
    .route("/stations", post(profiles::create_station::<S>))
    .route(
      "/stations/{id}",
      get(profiles::get_station::<S>)
        .patch(profiles::update_station::<S>)
        .delete(profiles::delete_station::<S>),
    )
    .route(
      "/observers",
      get(profiles::list_observers::<S>).post(profiles::create_observer::<S>),
    )
    .route(
      "/observers/{id}",
      get(profiles::get_observer::<S>)
        .patch(profiles::update_observer::<S>)
        .delete(profiles::delete_observer::<S>),
    )
    // Observer feedback
    .route("/feedback", get(feedback::list::<S>).post(feedback::submit::<S>))
    .route("/feedback/severity", get(feedback::severity::<S>))
    .route("/feedback/top-observers", get(feedback::top_observers::<S>))
    .route("/feedback/time-patterns", get(feedback::time_patterns::<S>))
    .route("/feedback/reliability", get(feedback::reliability::<S>))
    .route("/feedback/export", get(feedback::export::<S>))
    // Alerts, notifications, subscriptions
    .route("/alerts", get(alerts::list::<S>).post(alerts::create::<S>))
    .route("/alerts/ws", get(live::alerts_socket::<S>))
    .route("/alerts/{id}", get(alerts::get_one::<S>).patch(alerts::update::<S>))
    .route("/notifications/{id}/read", post(alerts::mark_read::<S>))
    .route("/users/{id}/notifications", get(alerts::notifications::<S>))
    .route(
      "/users/{id}/notifications/summary",
      get(alerts::notification_summary::<S>),
    )
    .route("/users/{id}/notifications/read-all", post(alerts::mark_all_read::<S>))
    .route(
      "/users/{id}/subscriptions",
      get(alerts::subscriptions::<S>).put(alerts::bulk_subscribe::<S>),
    )
    .route(
      "/users/{id}/subscriptions/analytics",
      get(alerts::subscription_analytics::<S>),
    )
    .route("/users/{id}/subscriptions/{alert_type}", put(alerts::subscribe::<S>))
    .route("/subscriptions/ws", get(live::subscriptions_socket::<S>))
    .with_state(state)
}

// ─── Parameter parsing ───────────────────────────────────────────────────────

/// Parse a text parameter, rejecting unknown values as invalid input.
pub(crate) fn parse_value<T: FromStr>(value: &str, name: &str) -> Result<T, ApiError> {
  value.parse().map_err(|_| {
    ApiError::from(Error::InvalidInput(format!("Invalid {name}: {value:?}")))
  })
}

pub(crate) fn parse_param<T: FromStr>(
  raw: Option<&str>,
  name: &str,
) -> Result<Option<T>, ApiError> {
  raw.map(|value| parse_value(value, name)).transpose()
}
