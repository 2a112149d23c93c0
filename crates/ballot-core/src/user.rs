//! Users, their roles, and the voter records that extend them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{UserId, VoterId};

/// What a user is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
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
pub enum Role {
  #[default]
  Voter,
  Admin,
}

/// An account. Email is unique across all users; users are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       UserId,
  pub name:          String,
  pub email:         String,
  pub role:          Role,
  /// Argon2 PHC string. Absent for users created by bulk upload, who cannot
  /// sign in until a password is set.
  #[serde(skip)]
  pub password_hash: Option<String>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`UserRepository::create_user`](crate::store::UserRepository::create_user).
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub role:          Role,
  pub password_hash: Option<String>,
}

/// Partial update; only `Some` fields overwrite.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
  pub name:          Option<String>,
  pub email:         Option<String>,
  pub password_hash: Option<String>,
  pub role:          Option<Role>,
}

impl UserPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none()
      && self.email.is_none()
      && self.password_hash.is_none()
      && self.role.is_none()
  }
}

/// At most one voter exists per user. `has_voted` only ever goes
/// `false → true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
  pub voter_id:  VoterId,
  pub user_id:   UserId,
  pub has_voted: bool,
}

/// Input to [`VoterRepository::register_voter`](crate::store::VoterRepository::register_voter).
///
/// The user and the voter are inserted together; a duplicate email or voter id
/// leaves neither row behind.
#[derive(Debug, Clone)]
pub struct NewVoter {
  pub voter_id: Option<VoterId>,
  pub user:     NewUser,
}

/// A voter joined with the identity fields of its user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterProfile {
  #[serde(flatten)]
  pub voter: Voter,
  pub name:  String,
  pub email: String,
  pub role:  Role,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub user_id: UserId,
  pub role:    Role,
}

impl Principal {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn role_text_encoding_matches_wire_casing() {
    assert_eq!(Role::Admin.to_string(), "admin");
    assert_eq!(Role::from_str("voter").unwrap(), Role::Voter);
    assert!(Role::from_str("nonexistent_role").is_err());
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
  }

  #[test]
  fn password_hash_never_serialised() {
    let user = User {
      user_id:       UserId(1),
      name:          "Ada".into(),
      email:         "ada@example.com".into(),
      role:          Role::Voter,
      password_hash: Some("$argon2id$secret".into()),
      created_at:    Utc::now(),
    };
    let json = serde_json::to_string(&user).unwrap();
    assert!(!json.contains("argon2"), "{json}");
  }

  #[test]
  fn voter_profile_flattens_voter_fields() {
    let profile = VoterProfile {
      voter: Voter { voter_id: VoterId(7), user_id: UserId(3), has_voted: true },
      name:  "Ada".into(),
      email: "ada@example.com".into(),
      role:  Role::Voter,
    };
    let value = serde_json::to_value(&profile).unwrap();
    assert_eq!(value["voter_id"], 7);
    assert_eq!(value["has_voted"], true);
    assert_eq!(value["role"], "voter");
  }
}
