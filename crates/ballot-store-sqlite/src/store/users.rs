//! Users and voters.

use ballot_core::{
  id::{UserId, VoterId},
  store::{Page, UserRepository, VoterFilter, VoterRepository},
  user::{NewUser, NewVoter, Role, User, UserPatch, Voter, VoterProfile},
};
use rusqlite::OptionalExtension as _;

use super::SqliteStore;
use crate::{
  Result,
  encode::{RawUser, RawVoterProfile, decode_enum, encode_dt, now},
};

/// Insert a user row and return its id. Shared by sign-up and voter
/// registration, which runs it inside a transaction.
fn insert_user(
  conn: &rusqlite::Connection,
  user: &NewUser,
  created_at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO users (name, email, role, password_hash, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      user.name,
      user.email,
      user.role.as_ref(),
      user.password_hash,
      created_at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

fn select_user(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
      [id],
      RawUser::from_row,
    )
    .optional()
}

fn select_voter(
  conn: &rusqlite::Connection,
  column: &str,
  value: i64,
) -> rusqlite::Result<Option<Voter>> {
  conn
    .query_row(
      &format!(
        "SELECT voter_id, user_id, has_voted FROM voters WHERE {column} = ?1"
      ),
      [value],
      |row| {
        Ok(Voter {
          voter_id:  VoterId(row.get(0)?),
          user_id:   UserId(row.get(1)?),
          has_voted: row.get(2)?,
        })
      },
    )
    .optional()
}

// ─── UserRepository ──────────────────────────────────────────────────────────

impl UserRepository for SqliteStore {
  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| Ok(insert_user(conn, &row, &at_str)?))
      .await?;

    Ok(User {
      user_id: UserId(id),
      name: input.name,
      email: input.email,
      role: input.role,
      password_hash: input.password_hash,
      created_at,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, id.0)?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM users WHERE email = ?1", RawUser::COLUMNS),
              [email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self, role: Option<Role>, page: Page) -> Result<Vec<User>> {
    let role_str = role.map(|r| r.to_string());

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM users
           WHERE (?1 IS NULL OR role = ?1)
           ORDER BY user_id
           LIMIT ?2 OFFSET ?3",
          RawUser::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![role_str, page.limit(), page.offset()],
            RawUser::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>> {
    let role_str = patch.role.map(|r| r.to_string());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET
             name          = COALESCE(?2, name),
             email         = COALESCE(?3, email),
             password_hash = COALESCE(?4, password_hash),
             role          = COALESCE(?5, role)
           WHERE user_id = ?1",
          rusqlite::params![
            id.0,
            patch.name,
            patch.email,
            patch.password_hash,
            role_str
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_user(conn, id.0)?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn count_users_by_role(&self) -> Result<Vec<(Role, i64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role",
        )?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(role, count)| Ok((decode_enum(&role, "role")?, count)))
      .collect()
  }
}

// ─── VoterRepository ─────────────────────────────────────────────────────────

impl VoterRepository for SqliteStore {
  async fn register_voter(&self, input: NewVoter) -> Result<VoterProfile> {
    let at_str = encode_dt(now());
    let NewVoter { voter_id, user } = input;
    let row = user.clone();

    let (user_id, voter_id) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let user_id = insert_user(&tx, &row, &at_str)?;
        tx.execute(
          "INSERT INTO voters (voter_id, user_id, has_voted) VALUES (?1, ?2, 0)",
          rusqlite::params![voter_id.map(|v| v.0), user_id],
        )?;
        let voter_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok((user_id, voter_id))
      })
      .await?;

    Ok(VoterProfile {
      voter: Voter {
        voter_id:  VoterId(voter_id),
        user_id:   UserId(user_id),
        has_voted: false,
      },
      name:  user.name,
      email: user.email,
      role:  user.role,
    })
  }

  async fn get_voter(&self, id: VoterId) -> Result<Option<Voter>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(select_voter(conn, "voter_id", id.0)?))
        .await?,
    )
  }

  async fn get_voter_by_user(&self, user_id: UserId) -> Result<Option<Voter>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(select_voter(conn, "user_id", user_id.0)?))
        .await?,
    )
  }

  async fn list_voter_profiles(&self, filter: VoterFilter) -> Result<Vec<VoterProfile>> {
    let raws: Vec<RawVoterProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT v.voter_id, v.user_id, v.has_voted, u.name, u.email, u.role
           FROM voters v
           JOIN users u ON u.user_id = v.user_id
           WHERE (?1 IS NULL OR v.has_voted = ?1)
           ORDER BY v.voter_id",
        )?;
        let rows = stmt
          .query_map([filter.has_voted], RawVoterProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVoterProfile::into_profile).collect()
  }
}
