//! Integer identifiers for every persisted entity.
//!
//! Each id is a distinct newtype so a `VoterId` can never be passed where an
//! `ElectionId` is expected. All ids are generated by the store, except voter
//! ids, which a registration may supply.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_types {
  ($($(#[$meta:meta])* $name:ident;)*) => {$(
    $(#[$meta])*
    #[derive(
      Debug,
      Clone,
      Copy,
      Default,
      PartialEq,
      Eq,
      PartialOrd,
      Ord,
      Hash,
      Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }

    impl From<$name> for i64 {
      fn from(id: $name) -> Self { id.0 }
    }
  )*};
}

id_types! {
  UserId;
  /// Distinct from [`UserId`]: a voter is a 1:1 extension of a user.
  VoterId;
  ElectionId;
  CandidateId;
  VoteId;
  StationId;
  ObserverId;
  FeedbackId;
  AuditLogId;
  AlertId;
  NotificationId;
  SubscriptionId;
}
