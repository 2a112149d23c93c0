//! Candidate profiles attached to an election.

use ballot_core::{
  Entity, Error, Result,
  election::{Candidate, CandidatePatch, NewCandidate},
  id::{CandidateId, ElectionId},
  store::{VotingStore, store_err},
};
use serde::Deserialize;

use crate::{Handle, elections::load_election, non_blank};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCandidate {
  pub name:        String,
  pub party:       Option<String>,
  pub bio:         Option<String>,
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Copy)]
pub struct GetCandidate {
  pub candidate_id: CandidateId,
}

#[derive(Debug, Clone, Copy)]
pub struct ListCandidates {
  pub election_id: ElectionId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCandidate {
  #[serde(skip)]
  pub candidate_id: CandidateId,
  pub name:         Option<String>,
  pub party:        Option<String>,
  pub bio:          Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteCandidate {
  pub candidate_id: CandidateId,
}

commands! {
  CreateCandidate => Candidate;
  UpdateCandidate => Candidate;
  DeleteCandidate => ();
}

queries! {
  GetCandidate => Candidate;
  ListCandidates => Vec<Candidate>;
}

fn missing(id: CandidateId) -> Error { Error::not_found(Entity::Candidate, id) }

impl<S: VotingStore> Handle<S> for CreateCandidate {
  async fn handle(self, store: &S) -> Result<Candidate> {
    let name = non_blank(self.name, "Name")?;
    load_election(store, self.election_id).await?;

    let candidate = store
      .create_candidate(NewCandidate {
        name,
        party: self.party,
        bio: self.bio,
        election_id: self.election_id,
      })
      .await
      .map_err(store_err)?;
    tracing::info!(
      candidate_id = %candidate.candidate_id,
      election_id = %candidate.election_id,
      "candidate created"
    );
    Ok(candidate)
  }
}

impl<S: VotingStore> Handle<S> for GetCandidate {
  async fn handle(self, store: &S) -> Result<Candidate> {
    store
      .get_candidate(self.candidate_id)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.candidate_id))
  }
}

impl<S: VotingStore> Handle<S> for ListCandidates {
  async fn handle(self, store: &S) -> Result<Vec<Candidate>> {
    load_election(store, self.election_id).await?;
    store
      .list_candidates(self.election_id)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for UpdateCandidate {
  async fn handle(self, store: &S) -> Result<Candidate> {
    let patch = CandidatePatch {
      name:  self.name.map(|n| non_blank(n, "Name")).transpose()?,
      party: self.party,
      bio:   self.bio,
    };
    store
      .update_candidate(self.candidate_id, patch)
      .await
      .map_err(store_err)?
      .ok_or(missing(self.candidate_id))
  }
}

impl<S: VotingStore> Handle<S> for DeleteCandidate {
  async fn handle(self, store: &S) -> Result<()> {
    if !store
      .delete_candidate(self.candidate_id)
      .await
      .map_err(store_err)?
    {
      return Err(missing(self.candidate_id));
    }
    tracing::info!(candidate_id = %self.candidate_id, "candidate deleted");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::testing;

  #[tokio::test]
  async fn candidate_crud() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["Ada"]).await;

    let created = bus
      .execute(CreateCandidate {
        name:        "Ada".into(),
        party:       Some("Analytical".into()),
        bio:         None,
        election_id: election.election_id,
      })
      .await
      .unwrap();

    let updated = bus
      .execute(UpdateCandidate {
        candidate_id: created.candidate_id,
        bio: Some("Engine designer".into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(updated.party.as_deref(), Some("Analytical"));
    assert_eq!(updated.bio.as_deref(), Some("Engine designer"));

    let listed = bus
      .ask(ListCandidates { election_id: election.election_id })
      .await
      .unwrap();
    assert_eq!(listed, vec![updated]);

    let delete = DeleteCandidate { candidate_id: created.candidate_id };
    bus.execute(delete).await.unwrap();
    let err = bus.execute(delete).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn candidate_needs_an_election() {
    let bus = testing::bus().await;
    let err = bus
      .execute(CreateCandidate {
        name:        "Ada".into(),
        party:       None,
        bio:         None,
        election_id: ElectionId(42),
      })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Election with ID 42 not found.");
  }
}
