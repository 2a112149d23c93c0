//! Use cases of the Ballot voting service, dispatched through a typed
//! command/query bus.
//!
//! Every use case is a plain request struct. Requests that change state are
//! [`Command`]s and are sent with [`Bus::execute`]; read-only requests are
//! [`Query`]s and are sent with [`Bus::ask`]. Each request type implements
//! [`Handle`] exactly once, so dispatch is resolved at compile time and a
//! request without a handler does not build.
//!
//! ```rust,ignore
//! let bus = Arc::new(Bus::new(store));
//! let outcome = bus.execute(CastVote { voter_id, election_id, candidate }).await?;
//! ```

use std::future::Future;

use ballot_core::{Error, Result, store::VotingStore};

/// Implements [`Request`] and [`Command`] for each listed type.
macro_rules! commands {
  ($($ty:ident => $out:ty;)*) => {$(
    impl $crate::Request for $ty {
      type Output = $out;
      const NAME: &'static str = stringify!($ty);
    }
    impl $crate::Command for $ty {}
  )*};
}

/// Implements [`Request`] and [`Query`] for each listed type.
macro_rules! queries {
  ($($ty:ident => $out:ty;)*) => {$(
    impl $crate::Request for $ty {
      type Output = $out;
      const NAME: &'static str = stringify!($ty);
    }
    impl $crate::Query for $ty {}
  )*};
}

pub mod alerts;
pub mod audit;
pub mod ballots;
pub mod candidates;
pub mod elections;
pub mod export;
pub mod feedback;
pub mod notifications;
pub mod observers;
pub mod password;
pub mod stations;
pub mod subscriptions;
pub mod users;
pub mod voters;

#[cfg(test)]
mod testing;

// ─── Request traits ──────────────────────────────────────────────────────────

/// A typed request with a fixed result type.
pub trait Request: Send + 'static {
  type Output: Send;

  /// Stable name of the request type, for logs and diagnostics.
  const NAME: &'static str;
}

/// A request that may change state.
pub trait Command: Request {}

/// A request that only reads.
pub trait Query: Request {}

/// The single handler for a request type.
pub trait Handle<S: VotingStore>: Request + Sized {
  fn handle(self, store: &S) -> impl Future<Output = Result<Self::Output>> + Send;
}

// ─── Bus ─────────────────────────────────────────────────────────────────────

/// Dispatches requests to their handlers against one store.
///
/// Built once at startup and shared as `Arc<Bus<S>>`. The bus adds nothing
/// around a handler: no logging, retries, or transactions. Each handler owns
/// its persistence work.
pub struct Bus<S> {
  store: S,
}

impl<S: VotingStore> Bus<S> {
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  /// Run a command and return its result or typed failure.
  pub async fn execute<C>(&self, command: C) -> Result<C::Output>
  where
    C: Command + Handle<S>,
  {
    command.handle(&self.store).await
  }

  /// Run a query and return its result or typed failure.
  pub async fn ask<Q>(&self, query: Q) -> Result<Q::Output>
  where
    Q: Query + Handle<S>,
  {
    query.handle(&self.store).await
  }
}

// ─── Input checks shared by handlers ─────────────────────────────────────────

/// `value` trimmed, or `InvalidInput` naming `field` when nothing is left.
pub(crate) fn non_blank(value: String, field: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidInput(format!("{field} must not be empty.")));
  }
  Ok(trimmed.to_owned())
}

pub(crate) fn email_address(value: String) -> Result<String> {
  let email = non_blank(value, "Email")?;
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
    _ => Err(Error::InvalidInput(format!("{email:?} is not an email address."))),
  }
}
