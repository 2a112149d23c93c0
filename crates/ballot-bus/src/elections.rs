//! Election lifecycle, results, and turnout reporting.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use ballot_core::{
  Entity, Error, Result,
  analytics::{percentage_2dp, results_csv},
  audit::AuditNote,
  election::{
    CandidateResult, ClosingOutcome, Election, ElectionResults, ElectionStatus, NewElection,
    Tally,
  },
  id::{ElectionId, UserId, VoterId},
  store::{StoreError as _, VoteFilter, VoterFilter, VotingStore, store_err},
  user::Role,
};
use serde::Serialize;

use crate::{
  Handle,
  export::{Export, ExportFormat},
  non_blank,
  users::load_user,
};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Open a new election with every tally at zero.
#[derive(Debug, Clone)]
pub struct CreateElection {
  pub actor:      UserId,
  pub name:       String,
  pub candidates: Vec<String>,
}

/// Close an active election. Completed elections stay completed.
#[derive(Debug, Clone, Copy)]
pub struct EndElection {
  pub actor:       UserId,
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct GetElection {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListElections;

#[derive(Debug, Clone, Copy)]
pub struct GetElectionResults {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct ResultsBreakdown {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct TopCandidate {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct CandidateSupport {
  pub election_id: ElectionId,
}

/// `format` is taken raw so an unsupported value is reported by the handler
/// like any other invalid input.
#[derive(Debug, Clone)]
pub struct ExportElectionResults {
  pub election_id: ElectionId,
  pub format:      String,
}

#[derive(Debug, Clone, Copy)]
pub struct ElectionTurnout {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct ParticipationByRole {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ElectionsSummary;

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateVotes {
  pub candidate_name: String,
  pub votes:          i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turnout {
  pub election_id:        ElectionId,
  pub total_voters:       i64,
  pub voted:              i64,
  pub turnout_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleParticipation {
  pub role:       Role,
  pub total:      i64,
  pub voted:      i64,
  pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionSummary {
  pub election_id:        ElectionId,
  pub name:               String,
  pub status:             ElectionStatus,
  pub total_votes:        i64,
  pub turnout_percentage: f64,
}

commands! {
  CreateElection => Election;
  EndElection => Election;
}

queries! {
  GetElection => Election;
  ListElections => Vec<Election>;
  GetElectionResults => ElectionResults;
  ResultsBreakdown => Vec<CandidateResult>;
  TopCandidate => Tally;
  CandidateSupport => Vec<CandidateVotes>;
  ExportElectionResults => Export<Vec<CandidateResult>>;
  ElectionTurnout => Turnout;
  ParticipationByRole => Vec<RoleParticipation>;
  ElectionsSummary => Vec<ElectionSummary>;
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub(crate) async fn load_election<S: VotingStore>(
  store: &S,
  id: ElectionId,
) -> Result<Election> {
  store
    .get_election(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::not_found(Entity::Election, id))
}

/// Distinct voters with a stored vote in `election_id`.
async fn participants<S: VotingStore>(
  store: &S,
  election_id: ElectionId,
) -> Result<HashSet<VoterId>> {
  let votes = store
    .list_votes(VoteFilter { election_id: Some(election_id), voter_id: None })
    .await
    .map_err(store_err)?;
  Ok(votes.into_iter().map(|v| v.voter_id).collect())
}

fn candidate_list(candidates: Vec<String>) -> Result<Vec<String>> {
  if candidates.is_empty() {
    return Err(Error::InvalidInput(
      "An election needs at least one candidate.".into(),
    ));
  }
  let mut seen = BTreeSet::new();
  candidates
    .into_iter()
    .map(|c| {
      let name = non_blank(c, "Candidate name")?;
      if !seen.insert(name.clone()) {
        return Err(Error::InvalidInput(format!(
          "Candidate {name:?} is listed more than once."
        )));
      }
      Ok(name)
    })
    .collect()
}

impl<S: VotingStore> Handle<S> for CreateElection {
  async fn handle(self, store: &S) -> Result<Election> {
    let name = non_blank(self.name, "Election name")?;
    let candidates = candidate_list(self.candidates)?;
    load_user(store, self.actor).await?;

    let audit = AuditNote {
      performed_by: self.actor,
      action:       "create_election".into(),
      details:      Some(format!("candidates: {}", candidates.join(", "))),
    };
    let election = store
      .create_election(NewElection { name: name.clone(), candidates }, audit)
      .await
      .map_err(|e| {
        if e.is_conflict() {
          Error::Duplicate(format!("An election named {name:?} already exists."))
        } else {
          store_err(e)
        }
      })?;

    tracing::info!(
      election_id = %election.election_id,
      actor = %self.actor,
      "election created"
    );
    Ok(election)
  }
}

impl<S: VotingStore> Handle<S> for EndElection {
  async fn handle(self, store: &S) -> Result<Election> {
    load_user(store, self.actor).await?;

    let audit = AuditNote {
      performed_by: self.actor,
      action:       "end_election".into(),
      details:      None,
    };
    let ended = match store
      .close_election(self.election_id, audit)
      .await
      .map_err(store_err)?
    {
      ClosingOutcome::Closed(election) => election,
      ClosingOutcome::AlreadyClosed => return Err(Error::ElectionClosed(self.election_id)),
      ClosingOutcome::NotFound => {
        return Err(Error::not_found(Entity::Election, self.election_id));
      }
    };

    tracing::info!(
      election_id = %self.election_id,
      actor = %self.actor,
      total_votes = ended.total_votes(),
      "election ended"
    );
    Ok(ended)
  }
}

impl<S: VotingStore> Handle<S> for GetElection {
  async fn handle(self, store: &S) -> Result<Election> {
    load_election(store, self.election_id).await
  }
}

impl<S: VotingStore> Handle<S> for ListElections {
  async fn handle(self, store: &S) -> Result<Vec<Election>> {
    store.list_elections().await.map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for GetElectionResults {
  async fn handle(self, store: &S) -> Result<ElectionResults> {
    Ok(load_election(store, self.election_id).await?.results())
  }
}

impl<S: VotingStore> Handle<S> for ResultsBreakdown {
  async fn handle(self, store: &S) -> Result<Vec<CandidateResult>> {
    Ok(load_election(store, self.election_id).await?.breakdown())
  }
}

impl<S: VotingStore> Handle<S> for TopCandidate {
  async fn handle(self, store: &S) -> Result<Tally> {
    let election = load_election(store, self.election_id).await?;
    election.top_candidate().cloned().ok_or_else(|| {
      Error::InvalidInput(format!("Election {} has no candidates.", self.election_id))
    })
  }
}

impl<S: VotingStore> Handle<S> for CandidateSupport {
  async fn handle(self, store: &S) -> Result<Vec<CandidateVotes>> {
    let election = load_election(store, self.election_id).await?;
    Ok(
      election
        .tallies
        .into_iter()
        .map(|t| CandidateVotes { candidate_name: t.candidate, votes: t.votes })
        .collect(),
    )
  }
}

impl<S: VotingStore> Handle<S> for ExportElectionResults {
  async fn handle(self, store: &S) -> Result<Export<Vec<CandidateResult>>> {
    let format = ExportFormat::parse(&self.format)?;
    let breakdown = load_election(store, self.election_id).await?.breakdown();
    Ok(match format {
      ExportFormat::Csv => Export::Csv(results_csv(&breakdown)),
      ExportFormat::Json => Export::Json(breakdown),
    })
  }
}

impl<S: VotingStore> Handle<S> for ElectionTurnout {
  async fn handle(self, store: &S) -> Result<Turnout> {
    load_election(store, self.election_id).await?;
    let total_voters = store
      .list_voter_profiles(VoterFilter::default())
      .await
      .map_err(store_err)?
      .len() as i64;
    let voted = participants(store, self.election_id).await?.len() as i64;

    Ok(Turnout {
      election_id: self.election_id,
      total_voters,
      voted,
      turnout_percentage: percentage_2dp(voted, total_voters),
    })
  }
}

impl<S: VotingStore> Handle<S> for ParticipationByRole {
  async fn handle(self, store: &S) -> Result<Vec<RoleParticipation>> {
    load_election(store, self.election_id).await?;
    let voted = participants(store, self.election_id).await?;
    let voters = store
      .list_voter_profiles(VoterFilter::default())
      .await
      .map_err(store_err)?;

    let mut by_role: BTreeMap<Role, (i64, i64)> = BTreeMap::new();
    for profile in &voters {
      let entry = by_role.entry(profile.role).or_default();
      entry.0 += 1;
      if voted.contains(&profile.voter.voter_id) {
        entry.1 += 1;
      }
    }

    Ok(
      by_role
        .into_iter()
        .map(|(role, (total, voted))| RoleParticipation {
          role,
          total,
          voted,
          percentage: percentage_2dp(voted, total),
        })
        .collect(),
    )
  }
}

impl<S: VotingStore> Handle<S> for ElectionsSummary {
  async fn handle(self, store: &S) -> Result<Vec<ElectionSummary>> {
    let elections = store.list_elections().await.map_err(store_err)?;
    let total_voters = store
      .list_voter_profiles(VoterFilter::default())
      .await
      .map_err(store_err)?
      .len() as i64;

    Ok(
      elections
        .into_iter()
        .map(|e| {
          let total_votes = e.total_votes();
          ElectionSummary {
            election_id: e.election_id,
            status: e.status,
            name: e.name,
            total_votes,
            turnout_percentage: percentage_2dp(total_votes, total_voters),
          }
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use ballot_core::ErrorKind;

  use super::*;
  use crate::{audit::ListAuditLogs, ballots::CastVote, testing};

  #[tokio::test]
  async fn create_election_validates_candidates() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;

    let rejected: [&[&str]; 3] = [&[], &["A", " "], &["A", "A"]];
    for candidates in rejected {
      let err = bus
        .execute(CreateElection {
          actor:      admin.user_id,
          name:       "Board".into(),
          candidates: candidates.iter().map(|c| (*c).to_owned()).collect(),
        })
        .await
        .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;
    assert_eq!(election.vote_counts(), vec![0, 0]);
    assert!(election.is_active());
  }

  #[tokio::test]
  async fn election_names_are_unique() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    testing::election(&bus, &admin, "Board", &["A"]).await;

    let err = bus
      .execute(CreateElection {
        actor:      admin.user_id,
        name:       "Board".into(),
        candidates: vec!["B".into()],
      })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
  }

  #[tokio::test]
  async fn end_election_once() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    let end = EndElection { actor: admin.user_id, election_id: election.election_id };

    let ended = bus.execute(end).await.unwrap();
    assert_eq!(ended.status, ElectionStatus::Completed);

    let err = bus.execute(end).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = bus
      .execute(EndElection { actor: admin.user_id, election_id: ElectionId(999) })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Election with ID 999 not found.");
  }

  #[tokio::test]
  async fn concurrent_ends_close_once() {
    let bus = Arc::new(testing::bus().await);
    let admin = testing::admin(&bus).await;

    for round in 0..10 {
      let election =
        testing::election(&bus, &admin, &format!("Board {round}"), &["A"]).await;
      let end = EndElection { actor: admin.user_id, election_id: election.election_id };

      let tasks: Vec<_> = (0..8)
        .map(|_| {
          let bus = bus.clone();
          tokio::spawn(async move { bus.execute(end).await })
        })
        .collect();
      let mut ended = 0;
      for task in tasks {
        match task.await.unwrap() {
          Ok(_) => ended += 1,
          Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
        }
      }
      assert_eq!(ended, 1);

      let actions: Vec<_> = bus
        .ask(ListAuditLogs { election_id: election.election_id })
        .await
        .unwrap()
        .into_iter()
        .map(|log| log.action)
        .collect();
      assert_eq!(actions, vec!["create_election", "end_election"]);
    }
  }

  #[tokio::test]
  async fn unknown_actor_creates_nothing() {
    let bus = testing::bus().await;
    let err = bus
      .execute(CreateElection {
        actor:      UserId(4242),
        name:       "Board".into(),
        candidates: vec!["A".into()],
      })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(bus.ask(ListElections).await.unwrap().is_empty());

    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    assert_eq!(election.name, "Board");
  }

  async fn voted_election() -> (crate::Bus<ballot_store_sqlite::SqliteStore>, Election) {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B", "C"]).await;
    for (i, candidate) in ["A", "A", "C", "A", "C"].into_iter().enumerate() {
      let voter = testing::voter(&bus, &format!("v{i}@example.com")).await;
      bus
        .execute(CastVote {
          voter_id:    voter.voter.voter_id,
          election_id: election.election_id,
          candidate:   candidate.into(),
        })
        .await
        .unwrap();
    }
    (bus, election)
  }

  #[tokio::test]
  async fn results_and_breakdown() {
    let (bus, election) = voted_election().await;
    let id = election.election_id;

    let results = bus.ask(GetElectionResults { election_id: id }).await.unwrap();
    assert_eq!(results.get("A"), Some(3));
    assert_eq!(results.get("B"), Some(0));
    assert_eq!(results.get("C"), Some(2));

    let pct: Vec<_> = bus
      .ask(ResultsBreakdown { election_id: id })
      .await
      .unwrap()
      .into_iter()
      .map(|r| r.percentage)
      .collect();
    assert_eq!(pct, vec![60, 0, 40]);

    let top = bus.ask(TopCandidate { election_id: id }).await.unwrap();
    assert_eq!(top, Tally { candidate: "A".into(), votes: 3 });
  }

  #[tokio::test]
  async fn export_formats() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A", "B"]).await;
    for (i, candidate) in ["A", "B"].into_iter().enumerate() {
      let voter = testing::voter(&bus, &format!("v{i}@example.com")).await;
      bus
        .execute(CastVote {
          voter_id:    voter.voter.voter_id,
          election_id: election.election_id,
          candidate:   candidate.into(),
        })
        .await
        .unwrap();
    }

    let export = |format: &str| ExportElectionResults {
      election_id: election.election_id,
      format:      format.into(),
    };
    assert_eq!(
      bus.ask(export("csv")).await.unwrap(),
      Export::Csv("Candidate,Votes,Percentage\r\nA,1,50\r\nB,1,50\r\n".into())
    );
    let Export::Json(rows) = bus.ask(export("json")).await.unwrap() else {
      panic!("expected json rows");
    };
    assert_eq!(rows.len(), 2);

    let err = bus.ask(export("xml")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
  }

  #[tokio::test]
  async fn turnout_guards_empty_electorate() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;

    let turnout = bus
      .ask(ElectionTurnout { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(turnout.total_voters, 0);
    assert_eq!(turnout.turnout_percentage, 0.0);
  }

  #[tokio::test]
  async fn turnout_and_summary_after_votes() {
    let (bus, election) = voted_election().await;
    testing::voter(&bus, "late@example.com").await;

    let turnout = bus
      .ask(ElectionTurnout { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!((turnout.voted, turnout.total_voters), (5, 6));
    assert_eq!(turnout.turnout_percentage, 83.33);

    let by_role = bus
      .ask(ParticipationByRole { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(by_role, vec![RoleParticipation {
      role:       Role::Voter,
      total:      6,
      voted:      5,
      percentage: 83.33,
    }]);

    let summary = bus.ask(ElectionsSummary).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].total_votes, 5);
  }
}
