//! Elections, their tallies, candidate profiles, and cast votes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
  analytics::floor_percentage,
  id::{CandidateId, ElectionId, VoteId, VoterId},
};

// ─── Election ────────────────────────────────────────────────────────────────

/// `Active → Completed`, once. `Completed` is terminal.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElectionStatus {
  #[default]
  Active,
  Completed,
}

/// One candidate's running count within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
  pub candidate: String,
  pub votes:     i64,
}

/// An election owns its tallies in ballot order. Candidate names and vote
/// counts are always aligned because they live in the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
  pub election_id: ElectionId,
  pub name:        String,
  pub status:      ElectionStatus,
  pub tallies:     Vec<Tally>,
  pub created_at:  DateTime<Utc>,
}

impl Election {
  pub fn is_active(&self) -> bool { self.status == ElectionStatus::Active }

  pub fn candidate_names(&self) -> Vec<&str> {
    self.tallies.iter().map(|t| t.candidate.as_str()).collect()
  }

  pub fn vote_counts(&self) -> Vec<i64> {
    self.tallies.iter().map(|t| t.votes).collect()
  }

  pub fn total_votes(&self) -> i64 { self.tallies.iter().map(|t| t.votes).sum() }

  /// Ballot position of `candidate`, matched exactly.
  pub fn position_of(&self, candidate: &str) -> Option<usize> {
    self.tallies.iter().position(|t| t.candidate == candidate)
  }

  pub fn results(&self) -> ElectionResults {
    ElectionResults(self.tallies.clone())
  }

  /// Per-candidate votes and floored percentage, in ballot order.
  pub fn breakdown(&self) -> Vec<CandidateResult> {
    let total = self.total_votes();
    self
      .tallies
      .iter()
      .map(|t| CandidateResult {
        candidate:  t.candidate.clone(),
        votes:      t.votes,
        percentage: floor_percentage(t.votes, total),
      })
      .collect()
  }

  /// The first candidate in ballot order holding the maximum count. Ties are
  /// not broken any further.
  pub fn top_candidate(&self) -> Option<&Tally> {
    let max = self.tallies.iter().map(|t| t.votes).max()?;
    self.tallies.iter().find(|t| t.votes == max)
  }
}

/// Input to [`ElectionRepository::create_election`](crate::store::ElectionRepository::create_election).
/// Every tally starts at zero.
#[derive(Debug, Clone)]
pub struct NewElection {
  pub name:       String,
  pub candidates: Vec<String>,
}

/// Ordered mapping of candidate name to vote count. Serialises as a JSON
/// object whose keys keep ballot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionResults(pub Vec<Tally>);

impl ElectionResults {
  pub fn get(&self, candidate: &str) -> Option<i64> {
    self.0.iter().find(|t| t.candidate == candidate).map(|t| t.votes)
  }
}

impl Serialize for ElectionResults {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for tally in &self.0 {
      map.serialize_entry(&tally.candidate, &tally.votes)?;
    }
    map.end()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
  pub candidate:  String,
  pub votes:      i64,
  /// Integer floor of `votes / total × 100`; 0 when no votes were cast.
  pub percentage: i64,
}

// ─── Candidate profiles ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
  pub candidate_id: CandidateId,
  pub name:         String,
  pub party:        Option<String>,
  pub bio:          Option<String>,
  pub election_id:  ElectionId,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
  pub name:        String,
  pub party:       Option<String>,
  pub bio:         Option<String>,
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePatch {
  pub name:  Option<String>,
  pub party: Option<String>,
  pub bio:   Option<String>,
}

// ─── Votes ───────────────────────────────────────────────────────────────────

/// A stored vote. At most one exists per (voter, election).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub vote_id:      VoteId,
  pub voter_id:     VoterId,
  pub election_id:  ElectionId,
  pub candidate:    String,
  pub candidate_id: Option<CandidateId>,
  pub cast_at:      DateTime<Utc>,
}

/// A vote to be cast.
#[derive(Debug, Clone)]
pub struct Ballot {
  pub voter_id:     VoterId,
  pub election_id:  ElectionId,
  pub candidate:    String,
  pub candidate_id: Option<CandidateId>,
}

/// What happened to a [`Ballot`]. Every variant except `Recorded` means the
/// transaction was rolled back and nothing changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotOutcome {
  Recorded { vote: Vote, election_name: String },
  VoterNotFound,
  AlreadyVoted,
  ElectionNotFound,
  ElectionClosed,
  CandidateNotFound,
}

/// What happened to a request to end an election. Only `Closed` changed
/// anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosingOutcome {
  Closed(Election),
  AlreadyClosed,
  NotFound,
}
