//! Election observers.

use ballot_core::{
  Entity, Error, Result,
  id::{ElectionId, ObserverId},
  observer::{NewObserver, Observer, ObserverPatch},
  store::{StoreError, VotingStore, store_err},
};
use serde::Deserialize;

use crate::{Handle, elections::load_election, email_address, non_blank};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateObserver {
  pub name:         String,
  pub email:        String,
  pub election_id:  ElectionId,
  pub organization: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct GetObserver {
  pub observer_id: ObserverId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListObservers {
  pub election_id: Option<ElectionId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateObserver {
  #[serde(skip)]
  pub observer_id:  ObserverId,
  pub name:         Option<String>,
  pub email:        Option<String>,
  pub organization: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteObserver {
  pub observer_id: ObserverId,
}

commands! {
  CreateObserver => Observer;
  UpdateObserver => Observer;
  DeleteObserver => ();
}

queries! {
  GetObserver => Observer;
  ListObservers => Vec<Observer>;
}

pub(crate) async fn load_observer<S: VotingStore>(
  store: &S,
  id: ObserverId,
) -> Result<Observer> {
  store
    .get_observer(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::not_found(Entity::Observer, id))
}

fn email_taken<E: StoreError>(e: E) -> Error {
  if e.is_conflict() {
    Error::Duplicate("Observer email already registered".into())
  } else {
    store_err(e)
  }
}

impl<S: VotingStore> Handle<S> for CreateObserver {
  async fn handle(self, store: &S) -> Result<Observer> {
    let input = NewObserver {
      name:         non_blank(self.name, "Name")?,
      email:        email_address(self.email)?,
      election_id:  self.election_id,
      organization: self.organization,
    };
    load_election(store, self.election_id).await?;

    let observer = store.create_observer(input).await.map_err(email_taken)?;
    tracing::info!(
      observer_id = %observer.observer_id,
      election_id = %observer.election_id,
      "observer registered"
    );
    Ok(observer)
  }
}

impl<S: VotingStore> Handle<S> for GetObserver {
  async fn handle(self, store: &S) -> Result<Observer> {
    load_observer(store, self.observer_id).await
  }
}

impl<S: VotingStore> Handle<S> for ListObservers {
  async fn handle(self, store: &S) -> Result<Vec<Observer>> {
    store
      .list_observers(self.election_id)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for UpdateObserver {
  async fn handle(self, store: &S) -> Result<Observer> {
    let patch = ObserverPatch {
      name:         self.name.map(|n| non_blank(n, "Name")).transpose()?,
      email:        self.email.map(email_address).transpose()?,
      organization: self.organization,
    };
    store
      .update_observer(self.observer_id, patch)
      .await
      .map_err(email_taken)?
      .ok_or(Error::not_found(Entity::Observer, self.observer_id))
  }
}

impl<S: VotingStore> Handle<S> for DeleteObserver {
  async fn handle(self, store: &S) -> Result<()> {
    if store
      .delete_observer(self.observer_id)
      .await
      .map_err(store_err)?
    {
      Ok(())
    } else {
      Err(Error::not_found(Entity::Observer, self.observer_id))
    }
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::testing;

  fn observer(election_id: ElectionId, email: &str) -> CreateObserver {
    CreateObserver {
      name: "Olive".into(),
      email: email.into(),
      election_id,
      organization: Some("Watchdog".into()),
    }
  }

  #[tokio::test]
  async fn observer_email_is_unique() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    bus
      .execute(observer(election.election_id, "olive@example.com"))
      .await
      .unwrap();
    let err = bus
      .execute(observer(election.election_id, "olive@example.com"))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
  }

  #[tokio::test]
  async fn observer_crud() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let board = testing::election(&bus, &admin, "Board", &["A"]).await;
    let other = testing::election(&bus, &admin, "Other", &["A"]).await;

    let olive = bus
      .execute(observer(board.election_id, "olive@example.com"))
      .await
      .unwrap();
    bus
      .execute(observer(other.election_id, "otto@example.com"))
      .await
      .unwrap();

    let on_board = bus
      .ask(ListObservers { election_id: Some(board.election_id) })
      .await
      .unwrap();
    assert_eq!(on_board.len(), 1);
    assert_eq!(bus.ask(ListObservers::default()).await.unwrap().len(), 2);

    let renamed = bus
      .execute(UpdateObserver {
        observer_id: olive.observer_id,
        organization: Some("Civic League".into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(renamed.organization.as_deref(), Some("Civic League"));
    assert_eq!(renamed.email, "olive@example.com");

    bus
      .execute(DeleteObserver { observer_id: olive.observer_id })
      .await
      .unwrap();
    let err = bus
      .ask(GetObserver { observer_id: olive.observer_id })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), format!("Observer with ID {} not found.", olive.observer_id));
  }
}
