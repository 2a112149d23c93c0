//! WebSocket feeds for alerts and subscription changes.
//!
//! Each socket gets a snapshot on connect and then follows the broadcast
//! channel in [`AppState`]. Client text frames are ignored; pings are
//! answered.

use axum::{
  extract::{
    State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use ballot_bus::{alerts::ListAlerts, subscriptions::ListSubscriptions};
use ballot_core::{
  alert::{Alert, Subscription},
  id::UserId,
  store::VotingStore,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{AppState, auth::CurrentUser, error::ApiError, extract::Query};

/// An event fanned out to connected sockets.
#[derive(Debug, Clone)]
pub enum LiveEvent {
  /// An alert was raised or changed status.
  Alert(Alert),
  /// A user's subscriptions after a bulk update.
  Subscriptions { user_id: UserId, subscriptions: Vec<Subscription> },
}

/// `GET /alerts/ws`
pub async fn alerts_socket<S: VotingStore + 'static>(
  ws: WebSocketUpgrade,
  State(state): State<AppState<S>>,
  CurrentUser(principal): CurrentUser,
) -> Result<Response, ApiError> {
  let alerts = state.bus.ask(ListAlerts::default()).await?;
  let snapshot = json!({ "alerts": alerts });
  let rx = state.live.subscribe();
  tracing::debug!(user_id = %principal.user_id, "alert feed connected");

  Ok(ws.on_upgrade(move |socket| {
    follow(socket, snapshot, rx, |event| match event {
      LiveEvent::Alert(alert) => Some(json!({ "alert": alert })),
      LiveEvent::Subscriptions { .. } => None,
    })
  }))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionFeed {
  pub user_id: UserId,
}

/// `GET /subscriptions/ws?user_id=..`
pub async fn subscriptions_socket<S: VotingStore + 'static>(
  ws: WebSocketUpgrade,
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Query(feed): Query<SubscriptionFeed>,
) -> Result<Response, ApiError> {
  caller.require_self_or_admin(feed.user_id)?;
  let subscriptions = state
    .bus
    .ask(ListSubscriptions { user_id: feed.user_id })
    .await?;
  let snapshot = json!({ "subscriptions": subscriptions });
  let rx = state.live.subscribe();
  let watched = feed.user_id;

  Ok(ws.on_upgrade(move |socket| {
    follow(socket, snapshot, rx, move |event| match event {
      LiveEvent::Subscriptions { user_id, subscriptions } if user_id == watched => {
        Some(json!({ "subscriptions": subscriptions }))
      }
      _ => None,
    })
  }))
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, value: &Value) -> bool {
  let text = value.to_string();
  sender.send(Message::Text(text.into())).await.is_ok()
}

/// Drive one socket until the client leaves or the channel closes. `render`
/// picks the events this socket cares about.
async fn follow<F>(
  socket: WebSocket,
  snapshot: Value,
  mut rx: broadcast::Receiver<LiveEvent>,
  render: F,
) where
  F: Fn(LiveEvent) -> Option<Value> + Send + 'static,
{
  let (mut sender, mut receiver) = socket.split();
  if !send(&mut sender, &snapshot).await {
    return;
  }

  loop {
    tokio::select! {
      msg = receiver.next() => match msg {
        Some(Ok(Message::Ping(data))) => {
          if sender.send(Message::Pong(data)).await.is_err() {
            break;
          }
        }
        Some(Ok(Message::Close(_))) | None => break,
        Some(Ok(_)) => {}
        Some(Err(e)) => {
          tracing::warn!(error = %e, "websocket error");
          break;
        }
      },
      event = rx.recv() => match event {
        Ok(event) => {
          if let Some(value) = render(event)
            && !send(&mut sender, &value).await
          {
            break;
          }
        }
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "live feed lagged");
        }
        Err(RecvError::Closed) => break,
      },
    }
  }
  tracing::debug!("live feed closed");
}
