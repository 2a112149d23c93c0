//! Polling stations, election observers, and the feedback observers file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ElectionId, FeedbackId, ObserverId, StationId};

// ─── Polling stations ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingStation {
  pub station_id:  StationId,
  pub name:        String,
  pub location:    String,
  pub election_id: ElectionId,
  pub capacity:    i64,
}

#[derive(Debug, Clone)]
pub struct NewPollingStation {
  pub name:        String,
  pub location:    String,
  pub election_id: ElectionId,
  pub capacity:    i64,
}

#[derive(Debug, Clone, Default)]
pub struct PollingStationPatch {
  pub name:     Option<String>,
  pub location: Option<String>,
  pub capacity: Option<i64>,
}

// ─── Observers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observer {
  pub observer_id:  ObserverId,
  pub name:         String,
  pub email:        String,
  pub election_id:  ElectionId,
  pub organization: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewObserver {
  pub name:         String,
  pub email:        String,
  pub election_id:  ElectionId,
  pub organization: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObserverPatch {
  pub name:         Option<String>,
  pub email:        Option<String>,
  pub organization: Option<String>,
}

// ─── Feedback ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
  Low,
  Medium,
  High,
}

impl Severity {
  /// Weight used by the integrity risk score.
  pub fn weight(self) -> i64 {
    match self {
      Self::Low => 1,
      Self::Medium => 2,
      Self::High => 3,
    }
  }
}

/// A report filed by an observer. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverFeedback {
  pub feedback_id:  FeedbackId,
  pub observer_id:  ObserverId,
  pub election_id:  ElectionId,
  pub description:  String,
  pub severity:     Severity,
  pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
  pub observer_id: ObserverId,
  pub election_id: ElectionId,
  pub description: String,
  pub severity:    Severity,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn severity_uses_upper_case_on_the_wire() {
    assert_eq!(Severity::High.to_string(), "HIGH");
    assert_eq!(Severity::from_str("MEDIUM").unwrap(), Severity::Medium);
    assert!(Severity::from_str("urgent").is_err());
    assert_eq!(serde_json::to_string(&Severity::Low).unwrap(), "\"LOW\"");
  }
}
