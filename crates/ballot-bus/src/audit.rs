//! Audit trail of privileged actions.

use ballot_core::{
  Result,
  audit::{AuditLog, NewAuditLog},
  id::{ElectionId, UserId},
  store::{VotingStore, store_err},
};
use serde::Deserialize;

use crate::{Handle, elections::load_election, non_blank, users::load_user};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuditLog {
  pub election_id:  ElectionId,
  pub performed_by: UserId,
  pub action:       String,
  pub details:      Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ListAuditLogs {
  pub election_id: ElectionId,
}

commands! {
  CreateAuditLog => AuditLog;
}

queries! {
  ListAuditLogs => Vec<AuditLog>;
}

impl<S: VotingStore> Handle<S> for CreateAuditLog {
  async fn handle(self, store: &S) -> Result<AuditLog> {
    let action = non_blank(self.action, "Action")?;
    load_election(store, self.election_id).await?;
    load_user(store, self.performed_by).await?;
    store
      .append_audit_log(NewAuditLog {
        election_id: self.election_id,
        performed_by: self.performed_by,
        action,
        details: self.details,
      })
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for ListAuditLogs {
  async fn handle(self, store: &S) -> Result<Vec<AuditLog>> {
    load_election(store, self.election_id).await?;
    store
      .list_audit_logs(self.election_id)
      .await
      .map_err(store_err)
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::testing;

  #[tokio::test]
  async fn entries_follow_privileged_actions() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;

    bus
      .execute(CreateAuditLog {
        election_id:  election.election_id,
        performed_by: admin.user_id,
        action:       "recount".into(),
        details:      Some("requested by observers".into()),
      })
      .await
      .unwrap();

    let actions: Vec<_> = bus
      .ask(ListAuditLogs { election_id: election.election_id })
      .await
      .unwrap()
      .into_iter()
      .map(|log| log.action)
      .collect();
    assert_eq!(actions, vec!["create_election", "recount"]);
  }

  #[tokio::test]
  async fn unknown_user_is_rejected() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    let err = bus
      .execute(CreateAuditLog {
        election_id:  election.election_id,
        performed_by: UserId(77),
        action:       "recount".into(),
        details:      None,
      })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }
}
