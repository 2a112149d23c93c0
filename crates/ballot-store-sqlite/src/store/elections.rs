//! Elections, their tallies, and the vote-casting transaction.

use ballot_core::{
  audit::AuditNote,
  election::{
    Ballot, BallotOutcome, ClosingOutcome, Election, ElectionStatus, NewElection,
    Tally, Vote,
  },
  id::{ElectionId, VoteId},
  store::{BallotRepository, ElectionRepository, VoteFilter},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use super::{SqliteStore, feedback::insert_audit_log};
use crate::{
  Result,
  encode::{RawElection, RawVote, encode_dt, now},
};

fn select_tallies(
  conn: &rusqlite::Connection,
  election_id: i64,
) -> rusqlite::Result<Vec<Tally>> {
  let mut stmt = conn.prepare_cached(
    "SELECT candidate, votes FROM tallies
     WHERE election_id = ?1
     ORDER BY position",
  )?;
  let rows = stmt
    .query_map([election_id], |row| {
      Ok(Tally { candidate: row.get(0)?, votes: row.get(1)? })
    })?
    .collect();
  rows
}

fn select_election(
  conn: &rusqlite::Connection,
  election_id: i64,
) -> rusqlite::Result<Option<RawElection>> {
  let row = conn
    .query_row(
      "SELECT election_id, name, status, created_at FROM elections
       WHERE election_id = ?1",
      [election_id],
      |row| {
        Ok(RawElection {
          election_id: row.get(0)?,
          name:        row.get(1)?,
          status:      row.get(2)?,
          created_at:  row.get(3)?,
          tallies:     Vec::new(),
        })
      },
    )
    .optional()?;

  match row {
    Some(mut raw) => {
      raw.tallies = select_tallies(conn, election_id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

/// [`ClosingOutcome`] before the row is decoded.
enum Closing {
  Closed(RawElection),
  AlreadyClosed,
  NotFound,
}

// ─── ElectionRepository ──────────────────────────────────────────────────────

impl ElectionRepository for SqliteStore {
  async fn create_election(
    &self,
    input: NewElection,
    audit: AuditNote,
  ) -> Result<Election> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let name = input.name.clone();
    let candidates = input.candidates.clone();

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO elections (name, status, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, ElectionStatus::Active.as_ref(), at_str],
        )?;
        let id = tx.last_insert_rowid();
        {
          let mut stmt = tx.prepare(
            "INSERT INTO tallies (election_id, position, candidate, votes)
             VALUES (?1, ?2, ?3, 0)",
          )?;
          for (position, candidate) in candidates.iter().enumerate() {
            stmt.execute(rusqlite::params![id, position as i64, candidate])?;
          }
        }
        insert_audit_log(&tx, id, &audit, &at_str)?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(Election {
      election_id: ElectionId(id),
      name:        input.name,
      status:      ElectionStatus::Active,
      tallies:     input
        .candidates
        .into_iter()
        .map(|candidate| Tally { candidate, votes: 0 })
        .collect(),
      created_at,
    })
  }

  async fn get_election(&self, id: ElectionId) -> Result<Option<Election>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_election(conn, id.0)?))
      .await?;
    raw.map(RawElection::into_election).transpose()
  }

  async fn list_elections(&self) -> Result<Vec<Election>> {
    let raws: Vec<RawElection> = self
      .conn
      .call(|conn| {
        let ids = {
          let mut stmt =
            conn.prepare("SELECT election_id FROM elections ORDER BY election_id")?;
          stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let mut raws = Vec::with_capacity(ids.len());
        for id in ids {
          if let Some(raw) = select_election(conn, id)? {
            raws.push(raw);
          }
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawElection::into_election).collect()
  }

  async fn close_election(
    &self,
    id: ElectionId,
    audit: AuditNote,
  ) -> Result<ClosingOutcome> {
    let at_str = encode_dt(now());

    let closed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // The status guard makes the flip happen at most once.
        let changed = tx.execute(
          "UPDATE elections SET status = ?2 WHERE election_id = ?1 AND status = ?3",
          rusqlite::params![
            id.0,
            ElectionStatus::Completed.as_ref(),
            ElectionStatus::Active.as_ref(),
          ],
        )?;
        if changed == 0 {
          let exists = tx
            .query_row("SELECT 1 FROM elections WHERE election_id = ?1", [id.0], |_| Ok(()))
            .optional()?
            .is_some();
          return Ok(if exists { Closing::AlreadyClosed } else { Closing::NotFound });
        }

        insert_audit_log(&tx, id.0, &audit, &at_str)?;
        let raw = select_election(&tx, id.0)?;
        tx.commit()?;
        Ok(raw.map_or(Closing::NotFound, Closing::Closed))
      })
      .await?;

    Ok(match closed {
      Closing::Closed(raw) => ClosingOutcome::Closed(raw.into_election()?),
      Closing::AlreadyClosed => ClosingOutcome::AlreadyClosed,
      Closing::NotFound => ClosingOutcome::NotFound,
    })
  }
}

// ─── BallotRepository ────────────────────────────────────────────────────────

impl BallotRepository for SqliteStore {
  async fn cast_ballot(&self, ballot: Ballot) -> Result<BallotOutcome> {
    let cast_at = now();
    let at_str = encode_dt(cast_at);

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the checks below and the
        // writes that follow cannot interleave with another ballot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let has_voted: Option<bool> = tx
          .query_row(
            "SELECT has_voted FROM voters WHERE voter_id = ?1",
            [ballot.voter_id.0],
            |row| row.get(0),
          )
          .optional()?;
        match has_voted {
          None => return Ok(BallotOutcome::VoterNotFound),
          Some(true) => return Ok(BallotOutcome::AlreadyVoted),
          Some(false) => {}
        }

        let election: Option<(String, String)> = tx
          .query_row(
            "SELECT name, status FROM elections WHERE election_id = ?1",
            [ballot.election_id.0],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((election_name, status)) = election else {
          return Ok(BallotOutcome::ElectionNotFound);
        };
        if status != ElectionStatus::Active.as_ref() {
          return Ok(BallotOutcome::ElectionClosed);
        }

        let incremented = tx.execute(
          "UPDATE tallies SET votes = votes + 1
           WHERE election_id = ?1 AND candidate = ?2",
          rusqlite::params![ballot.election_id.0, ballot.candidate],
        )?;
        if incremented == 0 {
          return Ok(BallotOutcome::CandidateNotFound);
        }

        tx.execute(
          "UPDATE voters SET has_voted = 1 WHERE voter_id = ?1",
          [ballot.voter_id.0],
        )?;
        tx.execute(
          "INSERT INTO votes (voter_id, election_id, candidate, candidate_id, cast_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            ballot.voter_id.0,
            ballot.election_id.0,
            ballot.candidate,
            ballot.candidate_id.map(|c| c.0),
            at_str,
          ],
        )?;
        let vote_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(BallotOutcome::Recorded {
          vote: Vote {
            vote_id: VoteId(vote_id),
            voter_id: ballot.voter_id,
            election_id: ballot.election_id,
            candidate: ballot.candidate,
            candidate_id: ballot.candidate_id,
            cast_at,
          },
          election_name,
        })
      })
      .await?;

    Ok(outcome)
  }

  async fn list_votes(&self, filter: VoteFilter) -> Result<Vec<Vote>> {
    let election_id = filter.election_id.map(|e| e.0);
    let voter_id = filter.voter_id.map(|v| v.0);

    let raws: Vec<RawVote> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM votes
           WHERE (?1 IS NULL OR election_id = ?1)
             AND (?2 IS NULL OR voter_id = ?2)
           ORDER BY cast_at, vote_id",
          RawVote::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![election_id, voter_id], RawVote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVote::into_vote).collect()
  }
}
