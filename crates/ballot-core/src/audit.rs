//! Append-only record of privileged actions taken against an election.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AuditLogId, ElectionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
  pub log_id:       AuditLogId,
  pub election_id:  ElectionId,
  pub performed_by: UserId,
  pub action:       String,
  pub details:      Option<String>,
  pub timestamp:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
  pub election_id:  ElectionId,
  pub performed_by: UserId,
  pub action:       String,
  pub details:      Option<String>,
}

/// An entry written in the same transaction as the change it records. The
/// store fills in the election id.
#[derive(Debug, Clone)]
pub struct AuditNote {
  pub performed_by: UserId,
  pub action:       String,
  pub details:      Option<String>,
}
