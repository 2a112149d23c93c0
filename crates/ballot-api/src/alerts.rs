//! Alerts, per-user notifications and alert subscriptions.
//!
//! Alert changes and bulk subscription updates are also published to the
//! live feeds in [`crate::live`].

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use ballot_bus::{
  alerts::{CreateAlert, GetAlert, ListAlerts, UpdateAlert},
  notifications::{
    GetNotification, InboxSummary, ListNotifications, MarkAllNotificationsRead,
    MarkNotificationRead, MarkedRead, NotificationSummary,
  },
  subscriptions::{
    AlertTypeActivity, BulkUpdateSubscriptions, ListSubscriptions, SubscriptionAnalytics,
    UpdateSubscription,
  },
};
use ballot_core::{
  alert::{Alert, AlertStatus, Notification, Subscription, SubscriptionChange},
  id::{AlertId, ElectionId, NotificationId, UserId},
  store::VotingStore,
};
use serde::Deserialize;

use crate::{
  AppState, LiveEvent,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path, Query},
  parse_param, parse_value,
};

// ─── Alerts ──────────────────────────────────────────────────────────────────

/// `POST /alerts`. Subscribers of the alert type are notified.
pub async fn create<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Json(body): Json<CreateAlert>,
) -> Result<impl IntoResponse, ApiError> {
  let raised = state.bus.execute(body).await?;
  state.publish(LiveEvent::Alert(raised.alert.clone()));
  Ok((StatusCode::CREATED, Json(raised)))
}

#[derive(Debug, Deserialize)]
pub struct AlertParams {
  pub election_id: Option<ElectionId>,
  pub status:      Option<String>,
}

/// `GET /alerts[?election_id=..][&status=new|acknowledged|resolved]`
pub async fn list<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Query(params): Query<AlertParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
  let status = parse_param::<AlertStatus>(params.status.as_deref(), "status")?;
  let alerts = state
    .bus
    .ask(ListAlerts { election_id: params.election_id, status })
    .await?;
  Ok(Json(alerts))
}

/// `GET /alerts/:id`
pub async fn get_one<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: CurrentUser,
  Path(alert_id): Path<AlertId>,
) -> Result<Json<Alert>, ApiError> {
  Ok(Json(state.bus.ask(GetAlert { alert_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: String,
}

/// `PATCH /alerts/:id`. Body: `{"status":"acknowledged"}`
pub async fn update<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Path(alert_id): Path<AlertId>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Alert>, ApiError> {
  let status: AlertStatus = parse_value(&body.status, "status")?;
  let alert = state.bus.execute(UpdateAlert { alert_id, status }).await?;
  state.publish(LiveEvent::Alert(alert.clone()));
  Ok(Json(alert))
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// `GET /users/:id/notifications`
pub async fn notifications<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Notification>>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(ListNotifications { user_id }).await?))
}

/// `GET /users/:id/notifications/summary`
pub async fn notification_summary<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<InboxSummary>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(NotificationSummary { user_id }).await?))
}

/// `POST /notifications/:id/read`
pub async fn mark_read<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(notification_id): Path<NotificationId>,
) -> Result<Json<Notification>, ApiError> {
  let notification = state.bus.ask(GetNotification { notification_id }).await?;
  caller.require_self_or_admin(notification.user_id)?;
  Ok(Json(state.bus.execute(MarkNotificationRead { notification_id }).await?))
}

/// `POST /users/:id/notifications/read-all`
pub async fn mark_all_read<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<MarkedRead>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.execute(MarkAllNotificationsRead { user_id }).await?))
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// `GET /users/:id/subscriptions`
pub async fn subscriptions<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(ListSubscriptions { user_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
  pub is_subscribed: bool,
}

/// `PUT /users/:id/subscriptions/:alert_type`. Body: `{"is_subscribed":true}`
pub async fn subscribe<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path((user_id, alert_type)): Path<(UserId, String)>,
  Json(body): Json<SubscribeBody>,
) -> Result<Json<Subscription>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  let subscription = state
    .bus
    .execute(UpdateSubscription { user_id, alert_type, is_subscribed: body.is_subscribed })
    .await?;
  Ok(Json(subscription))
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
  pub subscriptions: Vec<SubscriptionChange>,
}

/// `PUT /users/:id/subscriptions`. Body:
/// `{"subscriptions":[{"alert_type":..,"is_subscribed":..}]}`. Returns every
/// subscription the user now has.
pub async fn bulk_subscribe<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
  Json(body): Json<BulkBody>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  let subscriptions = state
    .bus
    .execute(BulkUpdateSubscriptions { user_id, changes: body.subscriptions })
    .await?;
  state.publish(LiveEvent::Subscriptions {
    user_id,
    subscriptions: subscriptions.clone(),
  });
  Ok(Json(subscriptions))
}

/// `GET /users/:id/subscriptions/analytics`
pub async fn subscription_analytics<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<Vec<AlertTypeActivity>>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(SubscriptionAnalytics { user_id }).await?))
}
