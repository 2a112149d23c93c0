//! Observer feedback and the audit log. Both are append-only.

use ballot_core::{
  audit::{AuditLog, AuditNote, NewAuditLog},
  id::{AuditLogId, ElectionId, FeedbackId},
  observer::{NewFeedback, ObserverFeedback},
  store::{AuditLogRepository, FeedbackFilter, FeedbackRepository},
};

use super::SqliteStore;
use crate::{
  Result,
  encode::{RawAuditLog, RawFeedback, encode_dt, now},
};

/// Append an audit row on `conn`, which may be an open transaction.
pub(super) fn insert_audit_log(
  conn: &rusqlite::Connection,
  election_id: i64,
  note: &AuditNote,
  at_str: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO audit_logs (election_id, performed_by, action, details, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      election_id,
      note.performed_by.0,
      note.action,
      note.details,
      at_str,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

impl FeedbackRepository for SqliteStore {
  async fn submit_feedback(&self, input: NewFeedback) -> Result<ObserverFeedback> {
    let submitted_at = now();
    let at_str = encode_dt(submitted_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observer_feedback
             (observer_id, election_id, description, severity, submitted_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            row.observer_id.0,
            row.election_id.0,
            row.description,
            row.severity.as_ref(),
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ObserverFeedback {
      feedback_id: FeedbackId(id),
      observer_id: input.observer_id,
      election_id: input.election_id,
      description: input.description,
      severity: input.severity,
      submitted_at,
    })
  }

  async fn list_feedback(&self, filter: FeedbackFilter) -> Result<Vec<ObserverFeedback>> {
    let election_id = filter.election_id.map(|e| e.0);
    let observer_id = filter.observer_id.map(|o| o.0);
    let severity = filter.severity.map(|s| s.to_string());

    let raws: Vec<RawFeedback> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM observer_feedback
           WHERE (?1 IS NULL OR election_id = ?1)
             AND (?2 IS NULL OR observer_id = ?2)
             AND (?3 IS NULL OR severity = ?3)
           ORDER BY submitted_at, feedback_id",
          RawFeedback::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![election_id, observer_id, severity],
            RawFeedback::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedback::into_feedback).collect()
  }
}

impl AuditLogRepository for SqliteStore {
  async fn append_audit_log(&self, input: NewAuditLog) -> Result<AuditLog> {
    let timestamp = now();
    let at_str = encode_dt(timestamp);
    let election_id = input.election_id.0;
    let note = AuditNote {
      performed_by: input.performed_by,
      action:       input.action.clone(),
      details:      input.details.clone(),
    };

    let id = self
      .conn
      .call(move |conn| Ok(insert_audit_log(conn, election_id, &note, &at_str)?))
      .await?;

    Ok(AuditLog {
      log_id: AuditLogId(id),
      election_id: input.election_id,
      performed_by: input.performed_by,
      action: input.action,
      details: input.details,
      timestamp,
    })
  }

  async fn list_audit_logs(&self, election_id: ElectionId) -> Result<Vec<AuditLog>> {
    let raws: Vec<RawAuditLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM audit_logs
           WHERE election_id = ?1
           ORDER BY log_id",
          RawAuditLog::COLUMNS
        ))?;
        let rows = stmt
          .query_map([election_id.0], RawAuditLog::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditLog::into_audit_log).collect()
  }
}
