//! Accounts: sign-up, sign-in, profile edits, and role administration.

use std::collections::BTreeMap;

use ballot_core::{
  Entity, Error, Result,
  analytics::percentage_2dp,
  id::UserId,
  store::{Page, StoreError as _, VoterFilter, VotingStore, store_err},
  user::{NewUser, Principal, Role, User, UserPatch},
};
use serde::{Deserialize, Serialize};

use crate::{
  Handle, email_address, non_blank,
  password::{hash_password, verify_password},
};

// ─── Requests ────────────────────────────────────────────────────────────────

/// Self-service registration. New accounts are always voters.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUp {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

/// Check an email/password pair. Every mismatch yields the same error so a
/// caller cannot learn which emails exist.
#[derive(Debug, Clone)]
pub struct Authenticate {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Clone, Copy)]
pub struct GetUser {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
  #[serde(skip)]
  pub user_id:  UserId,
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeRole {
  pub actor:   UserId,
  pub user_id: UserId,
  pub role:    Role,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListUsers {
  pub role: Option<Role>,
  pub page: Page,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListAdmins {
  pub page: Page,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserStatistics;

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCount {
  pub role:  Role,
  pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
  pub total_users:       i64,
  pub total_voters:      i64,
  /// Share of voters who have cast a ballot.
  pub voting_percentage: f64,
  pub roles:             Vec<RoleCount>,
}

commands! {
  SignUp => User;
  UpdateUser => User;
  ChangeRole => User;
}

queries! {
  Authenticate => Principal;
  GetUser => User;
  ListUsers => Vec<User>;
  ListAdmins => Vec<User>;
  UserStatistics => UserStats;
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub(crate) async fn load_user<S: VotingStore>(store: &S, id: UserId) -> Result<User> {
  store
    .get_user(id)
    .await
    .map_err(store_err)?
    .ok_or(Error::not_found(Entity::User, id))
}

fn email_taken() -> Error { Error::Duplicate("Email already registered".into()) }

impl<S: VotingStore> Handle<S> for SignUp {
  async fn handle(self, store: &S) -> Result<User> {
    let name = non_blank(self.name, "Name")?;
    let email = email_address(self.email)?;
    let password = non_blank(self.password, "Password")?;

    if store
      .find_user_by_email(email.clone())
      .await
      .map_err(store_err)?
      .is_some()
    {
      return Err(email_taken());
    }

    let user = store
      .create_user(NewUser {
        name,
        email,
        role: Role::Voter,
        password_hash: Some(hash_password(&password)?),
      })
      .await
      .map_err(|e| if e.is_conflict() { email_taken() } else { store_err(e) })?;

    tracing::info!(user_id = %user.user_id, "user signed up");
    Ok(user)
  }
}

impl<S: VotingStore> Handle<S> for Authenticate {
  async fn handle(self, store: &S) -> Result<Principal> {
    let user = store
      .find_user_by_email(self.email)
      .await
      .map_err(store_err)?
      .ok_or(Error::Unauthorized)?;

    let verified = user
      .password_hash
      .as_deref()
      .is_some_and(|phc| verify_password(&self.password, phc));
    if !verified {
      tracing::debug!(user_id = %user.user_id, "password rejected");
      return Err(Error::Unauthorized);
    }

    Ok(Principal { user_id: user.user_id, role: user.role })
  }
}

impl<S: VotingStore> Handle<S> for GetUser {
  async fn handle(self, store: &S) -> Result<User> { load_user(store, self.user_id).await }
}

impl<S: VotingStore> Handle<S> for UpdateUser {
  async fn handle(self, store: &S) -> Result<User> {
    let name = self.name.map(|n| non_blank(n, "Name")).transpose()?;
    let email = self.email.map(email_address).transpose()?;
    let password_hash = self
      .password
      .map(|p| non_blank(p, "Password").and_then(|p| hash_password(&p)))
      .transpose()?;

    if let Some(email) = &email {
      let owner = store
        .find_user_by_email(email.clone())
        .await
        .map_err(store_err)?;
      if owner.is_some_and(|u| u.user_id != self.user_id) {
        return Err(email_taken());
      }
    }

    let patch = UserPatch { name, email, password_hash, role: None };
    store
      .update_user(self.user_id, patch)
      .await
      .map_err(|e| if e.is_conflict() { email_taken() } else { store_err(e) })?
      .ok_or(Error::not_found(Entity::User, self.user_id))
  }
}

impl<S: VotingStore> Handle<S> for ChangeRole {
  async fn handle(self, store: &S) -> Result<User> {
    let patch = UserPatch { role: Some(self.role), ..Default::default() };
    let user = store
      .update_user(self.user_id, patch)
      .await
      .map_err(store_err)?
      .ok_or(Error::not_found(Entity::User, self.user_id))?;

    tracing::info!(
      actor = %self.actor,
      user_id = %self.user_id,
      role = %self.role,
      "role changed"
    );
    Ok(user)
  }
}

impl<S: VotingStore> Handle<S> for ListUsers {
  async fn handle(self, store: &S) -> Result<Vec<User>> {
    store.list_users(self.role, self.page).await.map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for ListAdmins {
  async fn handle(self, store: &S) -> Result<Vec<User>> {
    store
      .list_users(Some(Role::Admin), self.page)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for UserStatistics {
  async fn handle(self, store: &S) -> Result<UserStats> {
    let by_role: BTreeMap<Role, i64> = store
      .count_users_by_role()
      .await
      .map_err(store_err)?
      .into_iter()
      .collect();
    let voters = store
      .list_voter_profiles(VoterFilter::default())
      .await
      .map_err(store_err)?;

    let total_voters = voters.len() as i64;
    let voted = voters.iter().filter(|v| v.voter.has_voted).count() as i64;

    Ok(UserStats {
      total_users: by_role.values().sum(),
      total_voters,
      voting_percentage: percentage_2dp(voted, total_voters),
      roles: by_role
        .into_iter()
        .map(|(role, count)| RoleCount { role, count })
        .collect(),
    })
  }
}
