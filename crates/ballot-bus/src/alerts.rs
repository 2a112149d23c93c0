//! Alerts and their fan-out to subscribed users.

use ballot_core::{
  Entity, Error, Result,
  alert::{Alert, AlertRaised, AlertStatus, NewAlert},
  id::{AlertId, ElectionId},
  store::{AlertFilter, VotingStore, store_err},
};
use serde::Deserialize;

use crate::{Handle, elections::load_election, non_blank};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlert {
  pub election_id: ElectionId,
  pub alert_type:  String,
  pub message:     String,
}

/// Move an alert along `new → acknowledged → resolved`. Skipping a step is
/// allowed; going back is not.
#[derive(Debug, Clone, Copy)]
pub struct UpdateAlert {
  pub alert_id: AlertId,
  pub status:   AlertStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct GetAlert {
  pub alert_id: AlertId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListAlerts {
  pub election_id: Option<ElectionId>,
  pub status:      Option<AlertStatus>,
}

commands! {
  CreateAlert => AlertRaised;
  UpdateAlert => Alert;
}

queries! {
  GetAlert => Alert;
  ListAlerts => Vec<Alert>;
}

fn missing(id: AlertId) -> Error { Error::not_found(Entity::Alert, id) }

impl<S: VotingStore> Handle<S> for CreateAlert {
  async fn handle(self, store: &S) -> Result<AlertRaised> {
    let alert_type = non_blank(self.alert_type, "Alert type")?;
    let message = non_blank(self.message, "Message")?;
    load_election(store, self.election_id).await?;

    let raised = store
      .create_alert(NewAlert { election_id: self.election_id, alert_type, message })
      .await
      .map_err(store_err)?;

    tracing::info!(
      alert_id = %raised.alert.alert_id,
      alert_type = %raised.alert.alert_type,
      notified = raised.notifications.len(),
      "alert raised"
    );
    Ok(raised)
  }
}

impl<S: VotingStore> Handle<S> for UpdateAlert {
  async fn handle(self, store: &S) -> Result<Alert> {
    let current = store
      .get_alert(self.alert_id)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.alert_id))?;
    if !current.status.can_become(self.status) {
      return Err(Error::InvalidInput(format!(
        "Alert {} cannot move from {} back to {}.",
        self.alert_id, current.status, self.status
      )));
    }

    let alert = store
      .update_alert_status(self.alert_id, self.status)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.alert_id))?;
    tracing::info!(alert_id = %alert.alert_id, status = %alert.status, "alert updated");
    Ok(alert)
  }
}

impl<S: VotingStore> Handle<S> for GetAlert {
  async fn handle(self, store: &S) -> Result<Alert> {
    store
      .get_alert(self.alert_id)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.alert_id))
  }
}

impl<S: VotingStore> Handle<S> for ListAlerts {
  async fn handle(self, store: &S) -> Result<Vec<Alert>> {
    store
      .list_alerts(AlertFilter { election_id: self.election_id, status: self.status })
      .await
      .map_err(store_err)
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::{subscriptions::UpdateSubscription, testing};

  #[tokio::test]
  async fn alert_notifies_subscribers_only() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    let alice = testing::voter(&bus, "alice@example.com").await;
    let bob = testing::voter(&bus, "bob@example.com").await;

    for (user_id, is_subscribed) in [(alice.voter.user_id, true), (bob.voter.user_id, false)] {
      bus
        .execute(UpdateSubscription {
          user_id,
          alert_type: "fraud".into(),
          is_subscribed,
        })
        .await
        .unwrap();
    }

    let raised = bus
      .execute(CreateAlert {
        election_id: election.election_id,
        alert_type:  "fraud".into(),
        message:     "Ballot box tampering reported".into(),
      })
      .await
      .unwrap();
    assert_eq!(raised.alert.status, AlertStatus::New);
    assert_eq!(raised.notifications.len(), 1);
    assert_eq!(raised.notifications[0].user_id, alice.voter.user_id);
    assert!(!raised.notifications[0].is_read);
  }

  #[tokio::test]
  async fn alert_status_moves_forward_only() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    let alert = bus
      .execute(CreateAlert {
        election_id: election.election_id,
        alert_type:  "outage".into(),
        message:     "Station offline".into(),
      })
      .await
      .unwrap()
      .alert;

    let resolved = bus
      .execute(UpdateAlert { alert_id: alert.alert_id, status: AlertStatus::Resolved })
      .await
      .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);

    let err = bus
      .execute(UpdateAlert { alert_id: alert.alert_id, status: AlertStatus::New })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = bus
      .execute(UpdateAlert { alert_id: AlertId(99), status: AlertStatus::Resolved })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let open = bus
      .ask(ListAlerts { status: Some(AlertStatus::New), ..Default::default() })
      .await
      .unwrap();
    assert!(open.is_empty());
  }
}
