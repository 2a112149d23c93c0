//! Polling stations.

use ballot_core::{
  Entity, Error, Result,
  id::{ElectionId, StationId},
  observer::{NewPollingStation, PollingStation, PollingStationPatch},
  store::{VotingStore, store_err},
};
use serde::Deserialize;

use crate::{Handle, elections::load_election, non_blank};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollingStation {
  pub name:        String,
  pub location:    String,
  pub election_id: ElectionId,
  pub capacity:    i64,
}

#[derive(Debug, Clone, Copy)]
pub struct GetPollingStation {
  pub station_id: StationId,
}

#[derive(Debug, Clone, Copy)]
pub struct ListPollingStations {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePollingStation {
  #[serde(skip)]
  pub station_id: StationId,
  pub name:       Option<String>,
  pub location:   Option<String>,
  pub capacity:   Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeletePollingStation {
  pub station_id: StationId,
}

commands! {
  CreatePollingStation => PollingStation;
  UpdatePollingStation => PollingStation;
  DeletePollingStation => ();
}

queries! {
  GetPollingStation => PollingStation;
  ListPollingStations => Vec<PollingStation>;
}

fn missing(id: StationId) -> Error { Error::not_found(Entity::PollingStation, id) }

fn capacity(value: i64) -> Result<i64> {
  if value < 0 {
    return Err(Error::InvalidInput("Capacity must not be negative.".into()));
  }
  Ok(value)
}

impl<S: VotingStore> Handle<S> for CreatePollingStation {
  async fn handle(self, store: &S) -> Result<PollingStation> {
    let input = NewPollingStation {
      name:        non_blank(self.name, "Name")?,
      location:    non_blank(self.location, "Location")?,
      election_id: self.election_id,
      capacity:    capacity(self.capacity)?,
    };
    load_election(store, self.election_id).await?;
    store.create_station(input).await.map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for GetPollingStation {
  async fn handle(self, store: &S) -> Result<PollingStation> {
    store
      .get_station(self.station_id)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.station_id))
  }
}

impl<S: VotingStore> Handle<S> for ListPollingStations {
  async fn handle(self, store: &S) -> Result<Vec<PollingStation>> {
    load_election(store, self.election_id).await?;
    store.list_stations(self.election_id).await.map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for UpdatePollingStation {
  async fn handle(self, store: &S) -> Result<PollingStation> {
    let patch = PollingStationPatch {
      name:     self.name.map(|n| non_blank(n, "Name")).transpose()?,
      location: self.location.map(|l| non_blank(l, "Location")).transpose()?,
      capacity: self.capacity.map(capacity).transpose()?,
    };
    store
      .update_station(self.station_id, patch)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.station_id))
  }
}

impl<S: VotingStore> Handle<S> for DeletePollingStation {
  async fn handle(self, store: &S) -> Result<()> {
    match store.delete_station(self.station_id).await.map_err(store_err)? {
      true => Ok(()),
      false => Err(missing(self.station_id)),
    }
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::testing;

  fn station(election_id: ElectionId, capacity: i64) -> CreatePollingStation {
    CreatePollingStation {
      name: "Town Hall".into(),
      location: "Main St".into(),
      election_id,
      capacity,
    }
  }

  #[tokio::test]
  async fn capacity_must_not_be_negative() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    let err = bus.execute(station(election.election_id, -1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let created = bus.execute(station(election.election_id, 0)).await.unwrap();
    let err = bus
      .execute(UpdatePollingStation {
        station_id: created.station_id,
        capacity: Some(-5),
        ..Default::default()
      })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
  }

  #[tokio::test]
  async fn station_crud() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    let created = bus.execute(station(election.election_id, 300)).await.unwrap();
    let moved = bus
      .execute(UpdatePollingStation {
        station_id: created.station_id,
        location: Some("Elm St".into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(moved.location, "Elm St");
    assert_eq!(moved.capacity, 300);

    bus
      .execute(DeletePollingStation { station_id: created.station_id })
      .await
      .unwrap();
    let err = bus
      .ask(GetPollingStation { station_id: created.station_id })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(
      bus
        .ask(ListPollingStations { election_id: election.election_id })
        .await
        .unwrap()
        .is_empty()
    );
  }
}
