//! Candidate profiles, polling stations, and observers: plain CRUD tables
//! keyed by election.

use ballot_core::{
  election::{Candidate, CandidatePatch, NewCandidate},
  id::{CandidateId, ElectionId, ObserverId, StationId},
  observer::{
    NewObserver, NewPollingStation, Observer, ObserverPatch, PollingStation,
    PollingStationPatch,
  },
  store::{CandidateRepository, ObserverRepository, PollingStationRepository},
};
use rusqlite::{OptionalExtension as _, Row};

use super::SqliteStore;
use crate::Result;

// ─── Row mapping ─────────────────────────────────────────────────────────────

const CANDIDATE_COLUMNS: &str = "candidate_id, name, party, bio, election_id";

fn candidate_from_row(row: &Row<'_>) -> rusqlite::Result<Candidate> {
  Ok(Candidate {
    candidate_id: CandidateId(row.get(0)?),
    name:         row.get(1)?,
    party:        row.get(2)?,
    bio:          row.get(3)?,
    election_id:  ElectionId(row.get(4)?),
  })
}

const STATION_COLUMNS: &str = "station_id, name, location, election_id, capacity";

fn station_from_row(row: &Row<'_>) -> rusqlite::Result<PollingStation> {
  Ok(PollingStation {
    station_id:  StationId(row.get(0)?),
    name:        row.get(1)?,
    location:    row.get(2)?,
    election_id: ElectionId(row.get(3)?),
    capacity:    row.get(4)?,
  })
}

const OBSERVER_COLUMNS: &str = "observer_id, name, email, election_id, organization";

fn observer_from_row(row: &Row<'_>) -> rusqlite::Result<Observer> {
  Ok(Observer {
    observer_id:  ObserverId(row.get(0)?),
    name:         row.get(1)?,
    email:        row.get(2)?,
    election_id:  ElectionId(row.get(3)?),
    organization: row.get(4)?,
  })
}

fn select_one<T>(
  conn: &rusqlite::Connection,
  table: &str,
  columns: &str,
  key: &str,
  id: i64,
  map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
  conn
    .query_row(
      &format!("SELECT {columns} FROM {table} WHERE {key} = ?1"),
      [id],
      map,
    )
    .optional()
}

// ─── CandidateRepository ─────────────────────────────────────────────────────

impl CandidateRepository for SqliteStore {
  async fn create_candidate(&self, input: NewCandidate) -> Result<Candidate> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO candidates (name, party, bio, election_id)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row.name, row.party, row.bio, row.election_id.0],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Candidate {
      candidate_id: CandidateId(id),
      name:         input.name,
      party:        input.party,
      bio:          input.bio,
      election_id:  input.election_id,
    })
  }

  async fn get_candidate(&self, id: CandidateId) -> Result<Option<Candidate>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(select_one(
            conn,
            "candidates",
            CANDIDATE_COLUMNS,
            "candidate_id",
            id.0,
            candidate_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn list_candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates
             WHERE election_id = ?1
             ORDER BY candidate_id"
          ))?;
          let rows = stmt
            .query_map([election_id.0], candidate_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn update_candidate(
    &self,
    id: CandidateId,
    patch: CandidatePatch,
  ) -> Result<Option<Candidate>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let changed = conn.execute(
            "UPDATE candidates SET
               name  = COALESCE(?2, name),
               party = COALESCE(?3, party),
               bio   = COALESCE(?4, bio)
             WHERE candidate_id = ?1",
            rusqlite::params![id.0, patch.name, patch.party, patch.bio],
          )?;
          if changed == 0 {
            return Ok(None);
          }
          Ok(select_one(
            conn,
            "candidates",
            CANDIDATE_COLUMNS,
            "candidate_id",
            id.0,
            candidate_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn delete_candidate(&self, id: CandidateId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM candidates WHERE candidate_id = ?1", [id.0])?)
      })
      .await?;
    Ok(removed > 0)
  }
}

// ─── PollingStationRepository ────────────────────────────────────────────────

impl PollingStationRepository for SqliteStore {
  async fn create_station(&self, input: NewPollingStation) -> Result<PollingStation> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO polling_stations (name, location, election_id, capacity)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row.name, row.location, row.election_id.0, row.capacity],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(PollingStation {
      station_id:  StationId(id),
      name:        input.name,
      location:    input.location,
      election_id: input.election_id,
      capacity:    input.capacity,
    })
  }

  async fn get_station(&self, id: StationId) -> Result<Option<PollingStation>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(select_one(
            conn,
            "polling_stations",
            STATION_COLUMNS,
            "station_id",
            id.0,
            station_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn list_stations(&self, election_id: ElectionId) -> Result<Vec<PollingStation>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {STATION_COLUMNS} FROM polling_stations
             WHERE election_id = ?1
             ORDER BY station_id"
          ))?;
          let rows = stmt
            .query_map([election_id.0], station_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn update_station(
    &self,
    id: StationId,
    patch: PollingStationPatch,
  ) -> Result<Option<PollingStation>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let changed = conn.execute(
            "UPDATE polling_stations SET
               name     = COALESCE(?2, name),
               location = COALESCE(?3, location),
               capacity = COALESCE(?4, capacity)
             WHERE station_id = ?1",
            rusqlite::params![id.0, patch.name, patch.location, patch.capacity],
          )?;
          if changed == 0 {
            return Ok(None);
          }
          Ok(select_one(
            conn,
            "polling_stations",
            STATION_COLUMNS,
            "station_id",
            id.0,
            station_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn delete_station(&self, id: StationId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM polling_stations WHERE station_id = ?1", [id.0])?)
      })
      .await?;
    Ok(removed > 0)
  }
}

// ─── ObserverRepository ──────────────────────────────────────────────────────

impl ObserverRepository for SqliteStore {
  async fn create_observer(&self, input: NewObserver) -> Result<Observer> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observers (name, email, election_id, organization)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![row.name, row.email, row.election_id.0, row.organization],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Observer {
      observer_id:  ObserverId(id),
      name:         input.name,
      email:        input.email,
      election_id:  input.election_id,
      organization: input.organization,
    })
  }

  async fn get_observer(&self, id: ObserverId) -> Result<Option<Observer>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(select_one(
            conn,
            "observers",
            OBSERVER_COLUMNS,
            "observer_id",
            id.0,
            observer_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn list_observers(&self, election_id: Option<ElectionId>) -> Result<Vec<Observer>> {
    let election_id = election_id.map(|e| e.0);
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {OBSERVER_COLUMNS} FROM observers
             WHERE (?1 IS NULL OR election_id = ?1)
             ORDER BY observer_id"
          ))?;
          let rows = stmt
            .query_map([election_id], observer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn update_observer(
    &self,
    id: ObserverId,
    patch: ObserverPatch,
  ) -> Result<Option<Observer>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let changed = conn.execute(
            "UPDATE observers SET
               name         = COALESCE(?2, name),
               email        = COALESCE(?3, email),
               organization = COALESCE(?4, organization)
             WHERE observer_id = ?1",
            rusqlite::params![id.0, patch.name, patch.email, patch.organization],
          )?;
          if changed == 0 {
            return Ok(None);
          }
          Ok(select_one(
            conn,
            "observers",
            OBSERVER_COLUMNS,
            "observer_id",
            id.0,
            observer_from_row,
          )?)
        })
        .await?,
    )
  }

  async fn delete_observer(&self, id: ObserverId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM observers WHERE observer_id = ?1", [id.0])?)
      })
      .await?;
    Ok(removed > 0)
  }
}
