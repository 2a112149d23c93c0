//! Fixtures shared by handler tests.

use ballot_core::{
  election::Election,
  store::UserRepository,
  user::{NewUser, Role, User, VoterProfile},
};
use ballot_store_sqlite::SqliteStore;

use crate::{Bus, elections::CreateElection, password::hash_password, voters::RegisterVoter};

pub async fn bus() -> Bus<SqliteStore> {
  Bus::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

pub async fn admin(bus: &Bus<SqliteStore>) -> User {
  bus
    .store()
    .create_user(NewUser {
      name:          "Admin".into(),
      email:         "admin@example.com".into(),
      role:          Role::Admin,
      password_hash: Some(hash_password("admin-pass").unwrap()),
    })
    .await
    .unwrap()
}

pub async fn voter(bus: &Bus<SqliteStore>, email: &str) -> VoterProfile {
  bus
    .execute(RegisterVoter {
      voter_id: None,
      name:     format!("Voter {email}"),
      email:    email.into(),
      password: "voter-pass".into(),
    })
    .await
    .unwrap()
}

pub async fn election(
  bus: &Bus<SqliteStore>,
  admin: &User,
  name: &str,
  candidates: &[&str],
) -> Election {
  bus
    .execute(CreateElection {
      actor:      admin.user_id,
      name:       name.into(),
      candidates: candidates.iter().map(|c| (*c).to_owned()).collect(),
    })
    .await
    .unwrap()
}
