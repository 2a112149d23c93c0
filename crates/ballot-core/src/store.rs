//! Repository traits and the query types they accept.
//!
//! Storage backends (e.g. `ballot-store-sqlite`) implement every repository;
//! the handlers in `ballot-bus` depend only on these abstractions. Lookups
//! return `Option` for absent rows and never fail because data is missing.
//! Cross-entity validation belongs to the handlers, not here.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use serde::Deserialize;

use crate::{
  Error,
  alert::{
    Alert, AlertRaised, AlertStatus, NewAlert, Notification, Subscription,
    SubscriptionEvent,
  },
  audit::{AuditLog, AuditNote, NewAuditLog},
  election::{
    Ballot, BallotOutcome, Candidate, CandidatePatch, ClosingOutcome, Election,
    NewCandidate, NewElection, Vote,
  },
  id::{
    AlertId, CandidateId, ElectionId, NotificationId, ObserverId, StationId,
    UserId, VoterId,
  },
  observer::{
    NewFeedback, NewObserver, NewPollingStation, Observer, ObserverFeedback,
    ObserverPatch, PollingStation, PollingStationPatch, Severity,
  },
  user::{NewUser, NewVoter, Role, User, UserPatch, Voter, VoterProfile},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend error type. `is_conflict` reports a uniqueness or foreign-key
/// constraint violation, which handlers surface as [`Error::Conflict`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_conflict(&self) -> bool;
}

/// Convert a backend error into a domain error.
pub fn store_err<E: StoreError>(e: E) -> Error {
  if e.is_conflict() {
    Error::Conflict(e.to_string())
  } else {
    Error::Store(Box::new(e))
  }
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// One page of an unbounded listing. Page numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page:      u32,
  pub page_size: u32,
}

impl Page {
  pub const DEFAULT_SIZE: u32 = 20;
  pub const MAX_SIZE: u32 = 100;

  /// Clamp to `page ≥ 1` and `1 ≤ page_size ≤ 100`.
  pub fn new(page: u32, page_size: u32) -> Self {
    Self {
      page:      page.max(1),
      page_size: page_size.clamp(1, Self::MAX_SIZE),
    }
  }

  pub fn limit(&self) -> i64 { i64::from(self.page_size) }

  pub fn offset(&self) -> i64 {
    i64::from(self.page - 1) * i64::from(self.page_size)
  }
}

impl Default for Page {
  fn default() -> Self { Self::new(1, Self::DEFAULT_SIZE) }
}

/// Page parameters as they arrive in a query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
  pub page:      Option<u32>,
  pub page_size: Option<u32>,
}

impl From<PageParams> for Page {
  fn from(p: PageParams) -> Self {
    Self::new(p.page.unwrap_or(1), p.page_size.unwrap_or(Self::DEFAULT_SIZE))
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoterFilter {
  pub has_voted: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoteFilter {
  pub election_id: Option<ElectionId>,
  pub voter_id:    Option<VoterId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackFilter {
  pub election_id: Option<ElectionId>,
  pub observer_id: Option<ObserverId>,
  pub severity:    Option<Severity>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertFilter {
  pub election_id: Option<ElectionId>,
  pub status:      Option<AlertStatus>,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Shared error type for every repository a backend implements.
pub trait Repository: Send + Sync {
  type Error: StoreError;
}

pub trait UserRepository: Repository {
  /// Fails with a conflict if the email is already taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Exact, case-sensitive match.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Users ordered by id, optionally restricted to one role.
  fn list_users(
    &self,
    role: Option<Role>,
    page: Page,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply the `Some` fields of `patch`. Returns `None` if the user does not
  /// exist.
  fn update_user(
    &self,
    id: UserId,
    patch: UserPatch,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Number of users per role, for every role with at least one user.
  fn count_users_by_role(
    &self,
  ) -> impl Future<Output = Result<Vec<(Role, i64)>, Self::Error>> + Send + '_;
}

pub trait VoterRepository: Repository {
  /// Insert the user and the voter in one transaction.
  fn register_voter(
    &self,
    input: NewVoter,
  ) -> impl Future<Output = Result<VoterProfile, Self::Error>> + Send + '_;

  fn get_voter(
    &self,
    id: VoterId,
  ) -> impl Future<Output = Result<Option<Voter>, Self::Error>> + Send + '_;

  fn get_voter_by_user(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<Voter>, Self::Error>> + Send + '_;

  /// Voters joined with their users, ordered by voter id.
  fn list_voter_profiles(
    &self,
    filter: VoterFilter,
  ) -> impl Future<Output = Result<Vec<VoterProfile>, Self::Error>> + Send + '_;
}

pub trait ElectionRepository: Repository {
  /// Insert the election, its tallies and `audit` in one transaction. Fails
  /// with a conflict if the name is already used.
  fn create_election(
    &self,
    input: NewElection,
    audit: AuditNote,
  ) -> impl Future<Output = Result<Election, Self::Error>> + Send + '_;

  fn get_election(
    &self,
    id: ElectionId,
  ) -> impl Future<Output = Result<Option<Election>, Self::Error>> + Send + '_;

  /// All elections ordered by id.
  fn list_elections(
    &self,
  ) -> impl Future<Output = Result<Vec<Election>, Self::Error>> + Send + '_;

  /// Move an active election to completed and append `audit`, in one
  /// transaction. Of several concurrent calls for the same election, exactly
  /// one sees [`ClosingOutcome::Closed`].
  fn close_election(
    &self,
    id: ElectionId,
    audit: AuditNote,
  ) -> impl Future<Output = Result<ClosingOutcome, Self::Error>> + Send + '_;
}

pub trait BallotRepository: Repository {
  /// Check every precondition and record the vote atomically. Any outcome
  /// other than [`BallotOutcome::Recorded`] leaves the store unchanged.
  fn cast_ballot(
    &self,
    ballot: Ballot,
  ) -> impl Future<Output = Result<BallotOutcome, Self::Error>> + Send + '_;

  /// Votes ordered by cast time, then id.
  fn list_votes(
    &self,
    filter: VoteFilter,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + '_;
}

pub trait CandidateRepository: Repository {
  fn create_candidate(
    &self,
    input: NewCandidate,
  ) -> impl Future<Output = Result<Candidate, Self::Error>> + Send + '_;

  fn get_candidate(
    &self,
    id: CandidateId,
  ) -> impl Future<Output = Result<Option<Candidate>, Self::Error>> + Send + '_;

  fn list_candidates(
    &self,
    election_id: ElectionId,
  ) -> impl Future<Output = Result<Vec<Candidate>, Self::Error>> + Send + '_;

  fn update_candidate(
    &self,
    id: CandidateId,
    patch: CandidatePatch,
  ) -> impl Future<Output = Result<Option<Candidate>, Self::Error>> + Send + '_;

  /// Returns whether a row was removed.
  fn delete_candidate(
    &self,
    id: CandidateId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait PollingStationRepository: Repository {
  fn create_station(
    &self,
    input: NewPollingStation,
  ) -> impl Future<Output = Result<PollingStation, Self::Error>> + Send + '_;

  fn get_station(
    &self,
    id: StationId,
  ) -> impl Future<Output = Result<Option<PollingStation>, Self::Error>> + Send + '_;

  fn list_stations(
    &self,
    election_id: ElectionId,
  ) -> impl Future<Output = Result<Vec<PollingStation>, Self::Error>> + Send + '_;

  fn update_station(
    &self,
    id: StationId,
    patch: PollingStationPatch,
  ) -> impl Future<Output = Result<Option<PollingStation>, Self::Error>> + Send + '_;

  fn delete_station(
    &self,
    id: StationId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait ObserverRepository: Repository {
  /// Fails with a conflict if the email is already registered.
  fn create_observer(
    &self,
    input: NewObserver,
  ) -> impl Future<Output = Result<Observer, Self::Error>> + Send + '_;

  fn get_observer(
    &self,
    id: ObserverId,
  ) -> impl Future<Output = Result<Option<Observer>, Self::Error>> + Send + '_;

  /// Observers ordered by id, optionally restricted to one election.
  fn list_observers(
    &self,
    election_id: Option<ElectionId>,
  ) -> impl Future<Output = Result<Vec<Observer>, Self::Error>> + Send + '_;

  fn update_observer(
    &self,
    id: ObserverId,
    patch: ObserverPatch,
  ) -> impl Future<Output = Result<Option<Observer>, Self::Error>> + Send + '_;

  fn delete_observer(
    &self,
    id: ObserverId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait FeedbackRepository: Repository {
  fn submit_feedback(
    &self,
    input: NewFeedback,
  ) -> impl Future<Output = Result<ObserverFeedback, Self::Error>> + Send + '_;

  /// Feedback ordered by submission time, then id.
  fn list_feedback(
    &self,
    filter: FeedbackFilter,
  ) -> impl Future<Output = Result<Vec<ObserverFeedback>, Self::Error>> + Send + '_;
}

/// Append-only. Entries are never updated or deleted.
pub trait AuditLogRepository: Repository {
  fn append_audit_log(
    &self,
    input: NewAuditLog,
  ) -> impl Future<Output = Result<AuditLog, Self::Error>> + Send + '_;

  /// Oldest first.
  fn list_audit_logs(
    &self,
    election_id: ElectionId,
  ) -> impl Future<Output = Result<Vec<AuditLog>, Self::Error>> + Send + '_;
}

pub trait AlertRepository: Repository {
  /// Insert the alert in [`AlertStatus::New`] together with a notification
  /// for every user subscribed to its type, in one transaction.
  fn create_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<AlertRaised, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    id: AlertId,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_alerts(
    &self,
    filter: AlertFilter,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;

  fn update_alert_status(
    &self,
    id: AlertId,
    status: AlertStatus,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;
}

pub trait NotificationRepository: Repository {
  fn get_notification(
    &self,
    id: NotificationId,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_notifications(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  fn mark_notification_read(
    &self,
    id: NotificationId,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Returns the number of notifications that changed.
  fn mark_all_notifications_read(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

pub trait SubscriptionRepository: Repository {
  /// Ordered by alert type.
  fn list_subscriptions(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Subscription>, Self::Error>> + Send + '_;

  /// Insert or update the (user, alert type) row and append a
  /// [`SubscriptionEvent`] in the same transaction.
  fn upsert_subscription(
    &self,
    user_id: UserId,
    alert_type: String,
    is_subscribed: bool,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  /// Oldest first.
  fn list_subscription_events(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<SubscriptionEvent>, Self::Error>> + Send + '_;
}

/// Everything a handler may need. Implemented automatically for any type
/// that implements every repository.
pub trait VotingStore:
  UserRepository
  + VoterRepository
  + ElectionRepository
  + BallotRepository
  + CandidateRepository
  + PollingStationRepository
  + ObserverRepository
  + FeedbackRepository
  + AuditLogRepository
  + AlertRepository
  + NotificationRepository
  + SubscriptionRepository
{
}

impl<T> VotingStore for T where
  T: UserRepository
    + VoterRepository
    + ElectionRepository
    + BallotRepository
    + CandidateRepository
    + PollingStationRepository
    + ObserverRepository
    + FeedbackRepository
    + AuditLogRepository
    + AlertRepository
    + NotificationRepository
    + SubscriptionRepository
{
}
