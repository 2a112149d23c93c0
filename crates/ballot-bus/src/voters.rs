//! Voter registration and participation status.

use ballot_core::{
  Entity, Error, Result,
  id::{UserId, VoterId},
  store::{StoreError as _, VoterFilter, VotingStore, store_err},
  user::{NewUser, NewVoter, Role, Voter, VoterProfile},
};
use serde::{Deserialize, Serialize};

use crate::{Handle, email_address, non_blank, password::hash_password};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Create a user and its voter record together. `voter_id` may be chosen by
/// the caller; otherwise the store assigns one.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterVoter {
  pub voter_id: Option<VoterId>,
  pub name:     String,
  pub email:    String,
  pub password: String,
}

/// One row of a bulk upload. Uploaded users have no password until they set
/// one.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkVoter {
  pub name:  String,
  pub email: String,
  #[serde(default)]
  pub role:  Role,
}

/// Register many voters. Rows whose email is already taken, or that fail
/// validation, are skipped rather than failing the whole upload.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRegisterVoters {
  pub voters: Vec<BulkVoter>,
}

#[derive(Debug, Clone, Copy)]
pub struct GetVoter {
  pub voter_id: VoterId,
}

#[derive(Debug, Clone, Copy)]
pub struct GetVoterByUser {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Copy)]
pub struct HasVoted {
  pub user_id: UserId,
}

/// Every voter with name, email, and whether they have voted.
#[derive(Debug, Clone, Copy, Default)]
pub struct VotingStatus;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListInactiveVoters;

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BulkRegistration {
  pub created: Vec<VoterProfile>,
  pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HasVotedStatus {
  pub user_id:   UserId,
  pub has_voted: bool,
}

commands! {
  RegisterVoter => VoterProfile;
  BulkRegisterVoters => BulkRegistration;
}

queries! {
  GetVoter => Voter;
  GetVoterByUser => Voter;
  HasVoted => HasVotedStatus;
  VotingStatus => Vec<VoterProfile>;
  ListInactiveVoters => Vec<VoterProfile>;
}

// ─── Handlers ────────────────────────────────────────────────────────────────

impl<S: VotingStore> Handle<S> for RegisterVoter {
  async fn handle(self, store: &S) -> Result<VoterProfile> {
    let name = non_blank(self.name, "Name")?;
    let email = email_address(self.email)?;
    let password = non_blank(self.password, "Password")?;

    if store
      .find_user_by_email(email.clone())
      .await
      .map_err(store_err)?
      .is_some()
    {
      return Err(Error::Duplicate("Email already registered".into()));
    }
    if let Some(id) = self.voter_id
      && store.get_voter(id).await.map_err(store_err)?.is_some()
    {
      return Err(Error::Duplicate(format!("Voter with ID {id} already exists.")));
    }

    let profile = store
      .register_voter(NewVoter {
        voter_id: self.voter_id,
        user:     NewUser {
          name,
          email,
          role: Role::Voter,
          password_hash: Some(hash_password(&password)?),
        },
      })
      .await
      .map_err(store_err)?;

    tracing::info!(voter_id = %profile.voter.voter_id, "voter registered");
    Ok(profile)
  }
}

impl<S: VotingStore> Handle<S> for BulkRegisterVoters {
  async fn handle(self, store: &S) -> Result<BulkRegistration> {
    let mut created = Vec::new();
    let mut skipped = Vec::new();

    for row in self.voters {
      let (name, email) = match (non_blank(row.name, "Name"), email_address(row.email.clone())) {
        (Ok(name), Ok(email)) => (name, email),
        _ => {
          skipped.push(row.email);
          continue;
        }
      };

      let input = NewVoter {
        voter_id: None,
        user:     NewUser { name, email: email.clone(), role: row.role, password_hash: None },
      };
      match store.register_voter(input).await {
        Ok(profile) => created.push(profile),
        Err(e) if e.is_conflict() => skipped.push(email),
        Err(e) => return Err(store_err(e)),
      }
    }

    tracing::info!(
      created = created.len(),
      skipped = skipped.len(),
      "bulk voter upload processed"
    );
    Ok(BulkRegistration { created, skipped })
  }
}

impl<S: VotingStore> Handle<S> for GetVoter {
  async fn handle(self, store: &S) -> Result<Voter> {
    store
      .get_voter(self.voter_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::not_found(Entity::Voter, self.voter_id))
  }
}

impl<S: VotingStore> Handle<S> for GetVoterByUser {
  async fn handle(self, store: &S) -> Result<Voter> {
    store
      .get_voter_by_user(self.user_id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| {
        Error::InvalidInput(format!("User {} is not registered as a voter.", self.user_id))
      })
  }
}

impl<S: VotingStore> Handle<S> for HasVoted {
  async fn handle(self, store: &S) -> Result<HasVotedStatus> {
    let voter = store
      .get_voter_by_user(self.user_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::not_found(Entity::Voter, self.user_id))?;
    Ok(HasVotedStatus { user_id: self.user_id, has_voted: voter.has_voted })
  }
}

impl<S: VotingStore> Handle<S> for VotingStatus {
  async fn handle(self, store: &S) -> Result<Vec<VoterProfile>> {
    store
      .list_voter_profiles(VoterFilter::default())
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for ListInactiveVoters {
  async fn handle(self, store: &S) -> Result<Vec<VoterProfile>> {
    store
      .list_voter_profiles(VoterFilter { has_voted: Some(false) })
      .await
      .map_err(store_err)
  }
}
