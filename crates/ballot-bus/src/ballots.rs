//! Casting votes and the analytics computed from stored votes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use ballot_core::{
  Entity, Error, Result,
  analytics::{
    Confidence, TimeBucket, moving_average, percentage_2dp, percentage_change,
    population_std_dev, round2, trust_score,
  },
  election::{Ballot, BallotOutcome, Vote},
  id::{CandidateId, ElectionId, VoterId},
  store::{FeedbackFilter, VoteFilter, VotingStore, store_err},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Handle, elections::load_election};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Cast one vote for a candidate named on the election's ballot.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVote {
  pub voter_id:    VoterId,
  pub election_id: ElectionId,
  pub candidate:   String,
}

/// Cast one vote for a candidate profile. The profile must belong to the
/// election and its name must appear on the ballot.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CastVoteForCandidate {
  pub voter_id:     VoterId,
  pub election_id:  ElectionId,
  pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListVotes {
  pub election_id: Option<ElectionId>,
  pub voter_id:    Option<VoterId>,
}

#[derive(Debug, Clone, Copy)]
pub struct CandidateDistribution {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct VotingPatterns {
  pub election_id: ElectionId,
  pub interval:    TimeBucket,
}

/// Vote counts across several elections, each compared with the one before
/// it in id order.
#[derive(Debug, Clone, Default)]
pub struct TurnoutTrends {
  pub election_ids: Vec<ElectionId>,
}

#[derive(Debug, Clone, Copy)]
pub struct PredictTurnout {
  pub election_id: ElectionId,
  /// Earlier elections to average over. Defaults to 3.
  pub lookback:    Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct TurnoutConfidence {
  pub election_id: ElectionId,
  /// Defaults to 5.
  pub lookback:    Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct VotingSummary {
  pub election_id: ElectionId,
}

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastVoteResult {
  pub candidate:     String,
  pub election_name: String,
  pub vote:          Vote,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateShare {
  pub candidate:       String,
  pub vote_count:      i64,
  pub vote_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodCount {
  pub time_period: DateTime<Utc>,
  pub vote_count:  i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnoutTrend {
  pub election_id:       ElectionId,
  pub election_name:     String,
  pub vote_count:        i64,
  pub percentage_change: Option<f64>,
}

pub const NO_DATA: &str = "No Data";
pub const PROJECTED: &str = "Projection based on historical trends";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnoutForecast {
  pub election_id:       ElectionId,
  pub predicted_turnout: i64,
  /// Vote counts the forecast was built from, most recent first.
  pub history:           Vec<i64>,
  pub status:            &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceForecast {
  #[serde(flatten)]
  pub forecast:   TurnoutForecast,
  pub std_dev:    f64,
  /// `None` when there is no history to judge.
  pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionVotingSummary {
  pub election_id:            ElectionId,
  pub total_votes:            i64,
  /// Mean trust score of the election's observers; `None` without observers.
  pub average_observer_trust: Option<f64>,
}

commands! {
  CastVote => CastVoteResult;
  CastVoteForCandidate => CastVoteResult;
}

queries! {
  ListVotes => Vec<Vote>;
  CandidateDistribution => Vec<CandidateShare>;
  VotingPatterns => Vec<PeriodCount>;
  TurnoutTrends => Vec<TurnoutTrend>;
  PredictTurnout => TurnoutForecast;
  TurnoutConfidence => ConfidenceForecast;
  VotingSummary => ElectionVotingSummary;
}

// ─── Casting ─────────────────────────────────────────────────────────────────

async fn record<S: VotingStore>(store: &S, ballot: Ballot) -> Result<CastVoteResult> {
  let (voter_id, election_id) = (ballot.voter_id, ballot.election_id);
  let candidate = ballot.candidate.clone();

  let outcome = store.cast_ballot(ballot).await.map_err(store_err)?;
  match outcome {
    BallotOutcome::Recorded { vote, election_name } => {
      tracing::info!(%voter_id, %election_id, vote_id = %vote.vote_id, "vote cast");
      Ok(CastVoteResult { candidate: vote.candidate.clone(), election_name, vote })
    }
    rejected => {
      tracing::warn!(%voter_id, %election_id, outcome = ?rejected, "ballot rejected");
      Err(match rejected {
        BallotOutcome::VoterNotFound => Error::not_found(Entity::Voter, voter_id),
        BallotOutcome::AlreadyVoted => Error::AlreadyVoted(voter_id),
        BallotOutcome::ElectionNotFound => Error::not_found(Entity::Election, election_id),
        BallotOutcome::ElectionClosed => Error::ElectionClosed(election_id),
        BallotOutcome::CandidateNotFound | BallotOutcome::Recorded { .. } => {
          Error::CandidateNotFound { election_id, candidate }
        }
      })
    }
  }
}

impl<S: VotingStore> Handle<S> for CastVote {
  async fn handle(self, store: &S) -> Result<CastVoteResult> {
    record(store, Ballot {
      voter_id:     self.voter_id,
      election_id:  self.election_id,
      candidate:    self.candidate,
      candidate_id: None,
    })
    .await
  }
}

impl<S: VotingStore> Handle<S> for CastVoteForCandidate {
  async fn handle(self, store: &S) -> Result<CastVoteResult> {
    let candidate = store
      .get_candidate(self.candidate_id)
      .await
      .map_err(store_err)?
      .filter(|c| c.election_id == self.election_id)
      .ok_or(Error::not_found(Entity::Candidate, self.candidate_id))?;

    record(store, Ballot {
      voter_id:     self.voter_id,
      election_id:  self.election_id,
      candidate:    candidate.name,
      candidate_id: Some(candidate.candidate_id),
    })
    .await
  }
}

// ─── Analytics ───────────────────────────────────────────────────────────────

async fn votes_in<S: VotingStore>(store: &S, election_id: ElectionId) -> Result<Vec<Vote>> {
  store
    .list_votes(VoteFilter { election_id: Some(election_id), voter_id: None })
    .await
    .map_err(store_err)
}

impl<S: VotingStore> Handle<S> for ListVotes {
  async fn handle(self, store: &S) -> Result<Vec<Vote>> {
    store
      .list_votes(VoteFilter { election_id: self.election_id, voter_id: self.voter_id })
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for CandidateDistribution {
  async fn handle(self, store: &S) -> Result<Vec<CandidateShare>> {
    let election = load_election(store, self.election_id).await?;
    let total = election.total_votes();
    Ok(
      election
        .tallies
        .into_iter()
        .map(|t| CandidateShare {
          vote_percentage: percentage_2dp(t.votes, total),
          vote_count:      t.votes,
          candidate:       t.candidate,
        })
        .collect(),
    )
  }
}

impl<S: VotingStore> Handle<S> for VotingPatterns {
  async fn handle(self, store: &S) -> Result<Vec<PeriodCount>> {
    load_election(store, self.election_id).await?;
    let mut buckets: BTreeMap<DateTime<Utc>, i64> = BTreeMap::new();
    for vote in votes_in(store, self.election_id).await? {
      *buckets.entry(self.interval.truncate(vote.cast_at)).or_default() += 1;
    }
    Ok(
      buckets
        .into_iter()
        .map(|(time_period, vote_count)| PeriodCount { time_period, vote_count })
        .collect(),
    )
  }
}

impl<S: VotingStore> Handle<S> for TurnoutTrends {
  async fn handle(self, store: &S) -> Result<Vec<TurnoutTrend>> {
    let ids: BTreeSet<ElectionId> = self.election_ids.into_iter().collect();
    let mut trends = Vec::with_capacity(ids.len());
    let mut previous: Option<i64> = None;

    for id in ids {
      let Some(election) = store.get_election(id).await.map_err(store_err)? else {
        continue;
      };
      let vote_count = votes_in(store, id).await?.len() as i64;
      trends.push(TurnoutTrend {
        election_id: id,
        election_name: election.name,
        vote_count,
        percentage_change: previous.and_then(|p| percentage_change(p, vote_count)),
      });
      previous = Some(vote_count);
    }
    Ok(trends)
  }
}

/// Vote counts of up to `lookback` elections before `election_id` that
/// received any votes, most recent first.
async fn history<S: VotingStore>(
  store: &S,
  election_id: ElectionId,
  lookback: usize,
) -> Result<Vec<i64>> {
  load_election(store, election_id).await?;
  let mut earlier = store.list_elections().await.map_err(store_err)?;
  earlier.retain(|e| e.election_id < election_id);

  let mut counts = Vec::new();
  for election in earlier.iter().rev() {
    if counts.len() == lookback {
      break;
    }
    let count = votes_in(store, election.election_id).await?.len() as i64;
    if count > 0 {
      counts.push(count);
    }
  }
  Ok(counts)
}

fn forecast(election_id: ElectionId, history: Vec<i64>) -> TurnoutForecast {
  let status = if history.is_empty() { NO_DATA } else { PROJECTED };
  TurnoutForecast {
    election_id,
    predicted_turnout: moving_average(&history),
    history,
    status,
  }
}

impl<S: VotingStore> Handle<S> for PredictTurnout {
  async fn handle(self, store: &S) -> Result<TurnoutForecast> {
    let history = history(store, self.election_id, self.lookback.unwrap_or(3)).await?;
    Ok(forecast(self.election_id, history))
  }
}

impl<S: VotingStore> Handle<S> for TurnoutConfidence {
  async fn handle(self, store: &S) -> Result<ConfidenceForecast> {
    let history = history(store, self.election_id, self.lookback.unwrap_or(5)).await?;
    let std_dev = round2(population_std_dev(&history));
    let confidence = (!history.is_empty()).then(|| Confidence::from_std_dev(std_dev));
    Ok(ConfidenceForecast {
      forecast: forecast(self.election_id, history),
      std_dev,
      confidence,
    })
  }
}

impl<S: VotingStore> Handle<S> for VotingSummary {
  async fn handle(self, store: &S) -> Result<ElectionVotingSummary> {
    let election = load_election(store, self.election_id).await?;
    let observers = store
      .list_observers(Some(self.election_id))
      .await
      .map_err(store_err)?;
    let feedback = store
      .list_feedback(FeedbackFilter { election_id: Some(self.election_id), ..Default::default() })
      .await
      .map_err(store_err)?;

    let mut reports: HashMap<_, i64> = HashMap::new();
    for f in &feedback {
      *reports.entry(f.observer_id).or_default() += 1;
    }
    let average_observer_trust = (!observers.is_empty()).then(|| {
      let total: i64 = observers
        .iter()
        .map(|o| trust_score(reports.get(&o.observer_id).copied().unwrap_or(0)))
        .sum();
      round2(total as f64 / observers.len() as f64)
    });

    Ok(ElectionVotingSummary {
      election_id: self.election_id,
      total_votes: election.total_votes(),
      average_observer_trust,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use ballot_core::{ErrorKind, election::ElectionStatus, user::VoterProfile};

  use super::*;
  use crate::{
    candidates::CreateCandidate,
    elections::{EndElection, GetElection},
    testing,
    voters::GetVoter,
  };

  fn cast(voter: &VoterProfile, election_id: ElectionId, candidate: &str) -> CastVote {
    CastVote {
      voter_id: voter.voter.voter_id,
      election_id,
      candidate: candidate.into(),
    }
  }

  #[tokio::test]
  async fn cast_vote_updates_tally_and_voter() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;
    let voter = testing::voter(&bus, "v@example.com").await;

    let result = bus.execute(cast(&voter, election.election_id, "B")).await.unwrap();
    assert_eq!(result.candidate, "B");
    assert_eq!(result.election_name, "Board");

    let election = bus
      .ask(GetElection { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(election.vote_counts(), vec![0, 1]);
    let stored = bus.ask(GetVoter { voter_id: voter.voter.voter_id }).await.unwrap();
    assert!(stored.has_voted);
  }

  #[tokio::test]
  async fn second_vote_is_rejected_without_side_effects() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;
    let voter = testing::voter(&bus, "v@example.com").await;

    bus.execute(cast(&voter, election.election_id, "A")).await.unwrap();
    let err = bus
      .execute(cast(&voter, election.election_id, "B"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::AlreadyVoted(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let election = bus
      .ask(GetElection { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(election.vote_counts(), vec![1, 0]);
  }

  #[tokio::test]
  async fn each_rejection_is_distinct() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    let voter = testing::voter(&bus, "v@example.com").await;

    let err = bus
      .execute(CastVote {
        voter_id:    VoterId(999),
        election_id: election.election_id,
        candidate:   "A".into(),
      })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Voter with ID 999 not found.");

    let err = bus.execute(cast(&voter, ElectionId(999), "A")).await.unwrap_err();
    assert_eq!(err.to_string(), "Election with ID 999 not found.");

    let err = bus
      .execute(cast(&voter, election.election_id, "Z"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::CandidateNotFound { .. }));

    bus
      .execute(EndElection { actor: admin.user_id, election_id: election.election_id })
      .await
      .unwrap();
    let err = bus
      .execute(cast(&voter, election.election_id, "A"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::ElectionClosed(_)));

    let stored = bus.ask(GetVoter { voter_id: voter.voter.voter_id }).await.unwrap();
    assert!(!stored.has_voted);
    let closed = bus
      .ask(GetElection { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(closed.status, ElectionStatus::Completed);
    assert_eq!(closed.total_votes(), 0);
  }

  #[tokio::test]
  async fn concurrent_votes_are_all_counted() {
    let bus = Arc::new(testing::bus().await);
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;

    let mut voters = Vec::new();
    for i in 0..20 {
      voters.push(testing::voter(&bus, &format!("v{i}@example.com")).await);
    }

    let tasks: Vec<_> = voters
      .iter()
      .map(|voter| {
        let bus = bus.clone();
        let request = cast(voter, election.election_id, "A");
        tokio::spawn(async move { bus.execute(request).await })
      })
      .collect();
    for task in tasks {
      task.await.unwrap().unwrap();
    }

    let election = bus
      .ask(GetElection { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(election.vote_counts(), vec![20, 0]);
  }

  #[tokio::test]
  async fn vote_by_candidate_profile() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let board = testing::election(&bus, &admin, "Board", &["Ada"]).await;
    let other = testing::election(&bus, &admin, "Other", &["Ada"]).await;
    let voter = testing::voter(&bus, "v@example.com").await;

    let profile = bus
      .execute(CreateCandidate {
        name:        "Ada".into(),
        party:       None,
        bio:         None,
        election_id: board.election_id,
      })
      .await
      .unwrap();

    let err = bus
      .execute(CastVoteForCandidate {
        voter_id:     voter.voter.voter_id,
        election_id:  other.election_id,
        candidate_id: profile.candidate_id,
      })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let result = bus
      .execute(CastVoteForCandidate {
        voter_id:     voter.voter.voter_id,
        election_id:  board.election_id,
        candidate_id: profile.candidate_id,
      })
      .await
      .unwrap();
    assert_eq!(result.vote.candidate_id, Some(profile.candidate_id));
  }

  #[tokio::test]
  async fn distribution_and_patterns() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B", "C"]).await;
    for (i, candidate) in ["A", "B", "B"].into_iter().enumerate() {
      let voter = testing::voter(&bus, &format!("v{i}@example.com")).await;
      bus
        .execute(cast(&voter, election.election_id, candidate))
        .await
        .unwrap();
    }

    let shares = bus
      .ask(CandidateDistribution { election_id: election.election_id })
      .await
      .unwrap();
    let pct: Vec<_> = shares.iter().map(|s| s.vote_percentage).collect();
    assert_eq!(pct, vec![33.33, 66.67, 0.0]);

    let daily = bus
      .ask(VotingPatterns { election_id: election.election_id, interval: TimeBucket::Daily })
      .await
      .unwrap();
    assert_eq!(daily.iter().map(|p| p.vote_count).sum::<i64>(), 3);
    assert!(daily.windows(2).all(|w| w[0].time_period < w[1].time_period));
  }

  #[tokio::test]
  async fn trends_and_forecasts() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;

    let mut ids = Vec::new();
    let mut n = 0;
    for (name, votes) in [("E1", 2), ("E2", 0), ("E3", 4), ("E4", 0)] {
      let election = testing::election(&bus, &admin, name, &["A"]).await;
      for _ in 0..votes {
        let voter = testing::voter(&bus, &format!("v{n}@example.com")).await;
        n += 1;
        bus.execute(cast(&voter, election.election_id, "A")).await.unwrap();
      }
      ids.push(election.election_id);
    }

    let trends = bus
      .ask(TurnoutTrends { election_ids: vec![ids[2], ids[0], ElectionId(999), ids[1]] })
      .await
      .unwrap();
    let changes: Vec<_> = trends.iter().map(|t| t.percentage_change).collect();
    assert_eq!(changes, vec![None, Some(-100.0), None]);

    let forecast = bus
      .ask(PredictTurnout { election_id: ids[3], lookback: None })
      .await
      .unwrap();
    assert_eq!(forecast.history, vec![4, 2]);
    assert_eq!(forecast.predicted_turnout, 3);
    assert_eq!(forecast.status, PROJECTED);

    let first = bus
      .ask(PredictTurnout { election_id: ids[0], lookback: None })
      .await
      .unwrap();
    assert_eq!(first.predicted_turnout, 0);
    assert_eq!(first.status, NO_DATA);

    let confidence = bus
      .ask(TurnoutConfidence { election_id: ids[3], lookback: None })
      .await
      .unwrap();
    assert_eq!(confidence.std_dev, 1.0);
    assert_eq!(confidence.confidence, Some(Confidence::High));
  }

  #[tokio::test]
  async fn voting_summary_without_observers() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    let summary = bus
      .ask(VotingSummary { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(summary.total_votes, 0);
    assert_eq!(summary.average_observer_trust, None);
  }
}
