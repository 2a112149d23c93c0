//! Error types for `ballot-core`.

use thiserror::Error;

use crate::id::{ElectionId, VoterId};

/// The kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Entity {
  User,
  Voter,
  Election,
  Candidate,
  #[strum(to_string = "Polling station")]
  PollingStation,
  Observer,
  Feedback,
  Alert,
  Notification,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} with ID {id} not found.")]
  NotFound { entity: Entity, id: i64 },

  #[error("Candidate {candidate:?} is not standing in election {election_id}.")]
  CandidateNotFound {
    election_id: ElectionId,
    candidate:   String,
  },

  #[error("Voter {0} has already voted.")]
  AlreadyVoted(VoterId),

  #[error("Election {0} is already completed.")]
  ElectionClosed(ElectionId),

  /// A unique key the caller supplied is already taken (email, name, id).
  #[error("{0}")]
  Duplicate(String),

  /// A storage constraint rejected the write.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("{0}")]
  InvalidInput(String),

  #[error("Invalid email or password")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("password hashing error: {0}")]
  PasswordHash(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by transport layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Conflict,
  InvalidInput,
  Unauthorized,
  Forbidden,
  Internal,
}

impl Error {
  pub fn not_found(entity: Entity, id: impl Into<i64>) -> Self {
    Self::NotFound { entity, id: id.into() }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound { .. } | Self::CandidateNotFound { .. } => ErrorKind::NotFound,
      Self::AlreadyVoted(_)
      | Self::ElectionClosed(_)
      | Self::Duplicate(_)
      | Self::Conflict(_) => ErrorKind::Conflict,
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
      Self::Unauthorized => ErrorKind::Unauthorized,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::PasswordHash(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn not_found_message_names_entity_and_id() {
    let err = Error::not_found(Entity::Election, 999);
    assert_eq!(err.to_string(), "Election with ID 999 not found.");
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn polling_station_reads_naturally() {
    let err = Error::not_found(Entity::PollingStation, 4);
    assert_eq!(err.to_string(), "Polling station with ID 4 not found.");
  }

  #[test]
  fn double_vote_is_a_conflict() {
    assert_eq!(Error::AlreadyVoted(VoterId(1)).kind(), ErrorKind::Conflict);
  }
}
