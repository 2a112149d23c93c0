//! Alerts raised against an election, the notifications they fan out to, and
//! the per-user subscriptions that decide who receives them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AlertId, ElectionId, NotificationId, SubscriptionId, UserId};

// ─── Alerts ──────────────────────────────────────────────────────────────────

/// Review state of an alert. Variants are declared in lifecycle order, so the
/// derived `Ord` is the order in which an alert may move.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertStatus {
  #[default]
  New,
  Acknowledged,
  Resolved,
}

impl AlertStatus {
  /// Staying put or moving forward is allowed; moving backwards is not.
  pub fn can_become(self, next: AlertStatus) -> bool { next >= self }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:    AlertId,
  pub election_id: ElectionId,
  pub alert_type:  String,
  pub message:     String,
  pub status:      AlertStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
  pub election_id: ElectionId,
  pub alert_type:  String,
  pub message:     String,
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub notification_id: NotificationId,
  pub alert_id:        AlertId,
  pub user_id:         UserId,
  pub message:         String,
  /// Only ever goes `false → true`.
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
}

/// A newly raised alert and the notifications it produced, one per user
/// subscribed to its type at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRaised {
  pub alert:         Alert,
  pub notifications: Vec<Notification>,
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// One row per (user, alert type), created lazily on the first change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id: SubscriptionId,
  pub user_id:         UserId,
  pub alert_type:      String,
  pub is_subscribed:   bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// A requested subscription setting for one alert type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionChange {
  pub alert_type:    String,
  pub is_subscribed: bool,
}

/// History entry appended on every subscription upsert. `old_value` is `None`
/// when the row did not exist before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
  pub user_id:    UserId,
  pub alert_type: String,
  pub old_value:  Option<bool>,
  pub new_value:  bool,
  pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alert_status_only_moves_forward() {
    assert!(AlertStatus::New.can_become(AlertStatus::Acknowledged));
    assert!(AlertStatus::New.can_become(AlertStatus::Resolved));
    assert!(AlertStatus::Acknowledged.can_become(AlertStatus::Acknowledged));
    assert!(!AlertStatus::Resolved.can_become(AlertStatus::New));
    assert!(!AlertStatus::Acknowledged.can_become(AlertStatus::New));
  }
}
