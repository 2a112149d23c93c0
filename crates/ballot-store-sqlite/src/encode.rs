//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings in UTC with microsecond
//! precision, so they sort lexically. Enums are stored in their wire casing.

use std::str::FromStr;

use ballot_core::{
  alert::{Alert, Notification, Subscription, SubscriptionEvent},
  audit::AuditLog,
  election::{Election, Tally, Vote},
  id::{
    AlertId, AuditLogId, CandidateId, ElectionId, FeedbackId, NotificationId,
    ObserverId, SubscriptionId, UserId, VoteId, VoterId,
  },
  observer::ObserverFeedback,
  user::{User, Voter, VoterProfile},
};
use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(s: &str, what: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       i64,
  pub name:          String,
  pub email:         String,
  pub role:          String,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "user_id, name, email, role, password_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      role:          row.get(3)?,
      password_hash: row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       UserId(self.user_id),
      name:          self.name,
      email:         self.email,
      role:          decode_enum(&self.role, "role")?,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// A `voters` row joined with its user.
pub struct RawVoterProfile {
  pub voter_id:  i64,
  pub user_id:   i64,
  pub has_voted: bool,
  pub name:      String,
  pub email:     String,
  pub role:      String,
}

impl RawVoterProfile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      voter_id:  row.get(0)?,
      user_id:   row.get(1)?,
      has_voted: row.get(2)?,
      name:      row.get(3)?,
      email:     row.get(4)?,
      role:      row.get(5)?,
    })
  }

  pub fn into_profile(self) -> Result<VoterProfile> {
    Ok(VoterProfile {
      voter: Voter {
        voter_id:  VoterId(self.voter_id),
        user_id:   UserId(self.user_id),
        has_voted: self.has_voted,
      },
      name:  self.name,
      email: self.email,
      role:  decode_enum(&self.role, "role")?,
    })
  }
}

/// An `elections` row plus its tallies in ballot order.
pub struct RawElection {
  pub election_id: i64,
  pub name:        String,
  pub status:      String,
  pub created_at:  String,
  pub tallies:     Vec<Tally>,
}

impl RawElection {
  pub fn into_election(self) -> Result<Election> {
    Ok(Election {
      election_id: ElectionId(self.election_id),
      name:        self.name,
      status:      decode_enum(&self.status, "election status")?,
      tallies:     self.tallies,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawVote {
  pub vote_id:      i64,
  pub voter_id:     i64,
  pub election_id:  i64,
  pub candidate:    String,
  pub candidate_id: Option<i64>,
  pub cast_at:      String,
}

impl RawVote {
  pub const COLUMNS: &'static str =
    "vote_id, voter_id, election_id, candidate, candidate_id, cast_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vote_id:      row.get(0)?,
      voter_id:     row.get(1)?,
      election_id:  row.get(2)?,
      candidate:    row.get(3)?,
      candidate_id: row.get(4)?,
      cast_at:      row.get(5)?,
    })
  }

  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      vote_id:      VoteId(self.vote_id),
      voter_id:     VoterId(self.voter_id),
      election_id:  ElectionId(self.election_id),
      candidate:    self.candidate,
      candidate_id: self.candidate_id.map(CandidateId),
      cast_at:      decode_dt(&self.cast_at)?,
    })
  }
}

pub struct RawFeedback {
  pub feedback_id:  i64,
  pub observer_id:  i64,
  pub election_id:  i64,
  pub description:  String,
  pub severity:     String,
  pub submitted_at: String,
}

impl RawFeedback {
  pub const COLUMNS: &'static str =
    "feedback_id, observer_id, election_id, description, severity, submitted_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      feedback_id:  row.get(0)?,
      observer_id:  row.get(1)?,
      election_id:  row.get(2)?,
      description:  row.get(3)?,
      severity:     row.get(4)?,
      submitted_at: row.get(5)?,
    })
  }

  pub fn into_feedback(self) -> Result<ObserverFeedback> {
    Ok(ObserverFeedback {
      feedback_id:  FeedbackId(self.feedback_id),
      observer_id:  ObserverId(self.observer_id),
      election_id:  ElectionId(self.election_id),
      description:  self.description,
      severity:     decode_enum(&self.severity, "severity")?,
      submitted_at: decode_dt(&self.submitted_at)?,
    })
  }
}

pub struct RawAuditLog {
  pub log_id:       i64,
  pub election_id:  i64,
  pub performed_by: i64,
  pub action:       String,
  pub details:      Option<String>,
  pub timestamp:    String,
}

impl RawAuditLog {
  pub const COLUMNS: &'static str =
    "log_id, election_id, performed_by, action, details, timestamp";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      log_id:       row.get(0)?,
      election_id:  row.get(1)?,
      performed_by: row.get(2)?,
      action:       row.get(3)?,
      details:      row.get(4)?,
      timestamp:    row.get(5)?,
    })
  }

  pub fn into_audit_log(self) -> Result<AuditLog> {
    Ok(AuditLog {
      log_id:       AuditLogId(self.log_id),
      election_id:  ElectionId(self.election_id),
      performed_by: UserId(self.performed_by),
      action:       self.action,
      details:      self.details,
      timestamp:    decode_dt(&self.timestamp)?,
    })
  }
}

pub struct RawAlert {
  pub alert_id:    i64,
  pub election_id: i64,
  pub alert_type:  String,
  pub message:     String,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAlert {
  pub const COLUMNS: &'static str =
    "alert_id, election_id, alert_type, message, status, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:    row.get(0)?,
      election_id: row.get(1)?,
      alert_type:  row.get(2)?,
      message:     row.get(3)?,
      status:      row.get(4)?,
      created_at:  row.get(5)?,
      updated_at:  row.get(6)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      alert_id:    AlertId(self.alert_id),
      election_id: ElectionId(self.election_id),
      alert_type:  self.alert_type,
      message:     self.message,
      status:      decode_enum(&self.status, "alert status")?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawNotification {
  pub notification_id: i64,
  pub alert_id:        i64,
  pub user_id:         i64,
  pub message:         String,
  pub is_read:         bool,
  pub created_at:      String,
}

impl RawNotification {
  pub const COLUMNS: &'static str =
    "notification_id, alert_id, user_id, message, is_read, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      alert_id:        row.get(1)?,
      user_id:         row.get(2)?,
      message:         row.get(3)?,
      is_read:         row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      notification_id: NotificationId(self.notification_id),
      alert_id:        AlertId(self.alert_id),
      user_id:         UserId(self.user_id),
      message:         self.message,
      is_read:         self.is_read,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSubscription {
  pub subscription_id: i64,
  pub user_id:         i64,
  pub alert_type:      String,
  pub is_subscribed:   bool,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawSubscription {
  pub const COLUMNS: &'static str =
    "subscription_id, user_id, alert_type, is_subscribed, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id: row.get(0)?,
      user_id:         row.get(1)?,
      alert_type:      row.get(2)?,
      is_subscribed:   row.get(3)?,
      created_at:      row.get(4)?,
      updated_at:      row.get(5)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id: SubscriptionId(self.subscription_id),
      user_id:         UserId(self.user_id),
      alert_type:      self.alert_type,
      is_subscribed:   self.is_subscribed,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawSubscriptionEvent {
  pub user_id:    i64,
  pub alert_type: String,
  pub old_value:  Option<bool>,
  pub new_value:  bool,
  pub changed_at: String,
}

impl RawSubscriptionEvent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      alert_type: row.get(1)?,
      old_value:  row.get(2)?,
      new_value:  row.get(3)?,
      changed_at: row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<SubscriptionEvent> {
    Ok(SubscriptionEvent {
      user_id:    UserId(self.user_id),
      alert_type: self.alert_type,
      old_value:  self.old_value,
      new_value:  self.new_value,
      changed_at: decode_dt(&self.changed_at)?,
    })
  }
}
