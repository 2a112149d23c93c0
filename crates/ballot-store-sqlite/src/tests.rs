//! Integration tests for `SqliteStore` against an in-memory database.

use ballot_core::{
  alert::{AlertStatus, NewAlert},
  audit::{AuditNote, NewAuditLog},
  election::{
    Ballot, BallotOutcome, CandidatePatch, ClosingOutcome, ElectionStatus, NewCandidate,
    NewElection,
  },
  id::{ElectionId, NotificationId, UserId, VoterId},
  observer::{NewFeedback, NewObserver, NewPollingStation, Severity},
  store::{
    AlertFilter, AlertRepository, AuditLogRepository, BallotRepository,
    CandidateRepository, ElectionRepository, FeedbackFilter, FeedbackRepository,
    NotificationRepository, ObserverRepository, Page, PollingStationRepository,
    StoreError, SubscriptionRepository, UserRepository, VoteFilter, VoterFilter,
    VoterRepository,
  },
  user::{NewUser, NewVoter, Role, UserPatch},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_user(email: &str, role: Role) -> NewUser {
  NewUser {
    name: format!("User {email}"),
    email: email.into(),
    role,
    password_hash: Some("$argon2id$test".into()),
  }
}

async fn voter(s: &SqliteStore, email: &str) -> VoterId {
  s.register_voter(NewVoter { voter_id: None, user: new_user(email, Role::Voter) })
    .await
    .unwrap()
    .voter
    .voter_id
}

/// Author of the audit entries written alongside elections. Created on
/// first use.
async fn officer(s: &SqliteStore) -> UserId {
  let email = "officer@example.com";
  match s.find_user_by_email(email.into()).await.unwrap() {
    Some(user) => user.user_id,
    None => s.create_user(new_user(email, Role::Admin)).await.unwrap().user_id,
  }
}

fn note(performed_by: UserId, action: &str) -> AuditNote {
  AuditNote { performed_by, action: action.into(), details: None }
}

async fn election(s: &SqliteStore, name: &str, candidates: &[&str]) -> ElectionId {
  let by = officer(s).await;
  s.create_election(
    NewElection {
      name:       name.into(),
      candidates: candidates.iter().map(|c| (*c).to_owned()).collect(),
    },
    note(by, "create_election"),
  )
  .await
  .unwrap()
  .election_id
}

fn ballot(voter_id: VoterId, election_id: ElectionId, candidate: &str) -> Ballot {
  Ballot { voter_id, election_id, candidate: candidate.into(), candidate_id: None }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let user = s.create_user(new_user("ada@example.com", Role::Admin)).await.unwrap();

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.email, "ada@example.com");
  assert_eq!(fetched.role, Role::Admin);
  assert_eq!(fetched.created_at, user.created_at);
  assert_eq!(fetched.password_hash.as_deref(), Some("$argon2id$test"));

  let by_email = s.find_user_by_email("ada@example.com".into()).await.unwrap();
  assert_eq!(by_email.unwrap().user_id, user.user_id);
  assert!(s.get_user(UserId(999)).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
  let s = store().await;
  s.create_user(new_user("dup@example.com", Role::Voter)).await.unwrap();
  let err = s
    .create_user(new_user("dup@example.com", Role::Voter))
    .await
    .unwrap_err();
  assert!(err.is_conflict(), "{err}");
}

#[tokio::test]
async fn update_user_only_overwrites_supplied_fields() {
  let s = store().await;
  let user = s.create_user(new_user("a@example.com", Role::Voter)).await.unwrap();

  let patch = UserPatch { role: Some(Role::Admin), ..Default::default() };
  let updated = s.update_user(user.user_id, patch).await.unwrap().unwrap();
  assert_eq!(updated.role, Role::Admin);
  assert_eq!(updated.name, user.name);
  assert_eq!(updated.email, user.email);

  let missing = s.update_user(UserId(42), UserPatch::default()).await.unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn list_users_filters_and_pages() {
  let s = store().await;
  for i in 0..5 {
    s.create_user(new_user(&format!("v{i}@example.com"), Role::Voter)).await.unwrap();
  }
  s.create_user(new_user("admin@example.com", Role::Admin)).await.unwrap();

  let admins = s.list_users(Some(Role::Admin), Page::default()).await.unwrap();
  assert_eq!(admins.len(), 1);

  let page2 = s.list_users(None, Page::new(2, 4)).await.unwrap();
  assert_eq!(page2.len(), 2);

  let counts = s.count_users_by_role().await.unwrap();
  assert_eq!(counts, vec![(Role::Admin, 1), (Role::Voter, 5)]);
}

// ─── Voters ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_voter_with_supplied_id() {
  let s = store().await;
  let profile = s
    .register_voter(NewVoter {
      voter_id: Some(VoterId(1001)),
      user:     new_user("v@example.com", Role::Voter),
    })
    .await
    .unwrap();
  assert_eq!(profile.voter.voter_id, VoterId(1001));
  assert!(!profile.voter.has_voted);

  let by_user = s.get_voter_by_user(profile.voter.user_id).await.unwrap().unwrap();
  assert_eq!(by_user.voter_id, VoterId(1001));
}

#[tokio::test]
async fn failed_registration_leaves_no_partial_rows() {
  let s = store().await;
  s.register_voter(NewVoter {
    voter_id: Some(VoterId(7)),
    user:     new_user("first@example.com", Role::Voter),
  })
  .await
  .unwrap();

  // Same voter id, fresh email: the user insert succeeds, then the voter
  // insert fails and must take the user with it.
  let err = s
    .register_voter(NewVoter {
      voter_id: Some(VoterId(7)),
      user:     new_user("second@example.com", Role::Voter),
    })
    .await
    .unwrap_err();
  assert!(err.is_conflict());
  assert!(
    s.find_user_by_email("second@example.com".into())
      .await
      .unwrap()
      .is_none()
  );

  let err = s
    .register_voter(NewVoter {
      voter_id: None,
      user:     new_user("first@example.com", Role::Voter),
    })
    .await
    .unwrap_err();
  assert!(err.is_conflict());

  let voters = s.list_voter_profiles(VoterFilter::default()).await.unwrap();
  assert_eq!(voters.len(), 1);
}

// ─── Elections and ballots ───────────────────────────────────────────────────

#[tokio::test]
async fn new_election_starts_at_zero() {
  let s = store().await;
  let id = election(&s, "Board", &["A", "B", "C"]).await;
  let e = s.get_election(id).await.unwrap().unwrap();
  assert_eq!(e.candidate_names(), vec!["A", "B", "C"]);
  assert_eq!(e.vote_counts(), vec![0, 0, 0]);
  assert_eq!(e.status, ElectionStatus::Active);
}

#[tokio::test]
async fn duplicate_election_name_is_a_conflict() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let by = officer(&s).await;
  let err = s
    .create_election(
      NewElection { name: "Board".into(), candidates: vec!["B".into()] },
      note(by, "create_election"),
    )
    .await
    .unwrap_err();
  assert!(err.is_conflict());
  assert_eq!(s.list_elections().await.unwrap().len(), 1);
  assert_eq!(s.list_audit_logs(e).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_audit_entry_rolls_back_the_election() {
  let s = store().await;
  let err = s
    .create_election(
      NewElection { name: "Board".into(), candidates: vec!["A".into()] },
      note(UserId(4242), "create_election"),
    )
    .await
    .unwrap_err();
  assert!(err.is_conflict());
  assert!(s.list_elections().await.unwrap().is_empty());

  // The name is still free.
  election(&s, "Board", &["A"]).await;
}

#[tokio::test]
async fn closing_flips_status_once() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let by = officer(&s).await;

  let ClosingOutcome::Closed(closed) =
    s.close_election(e, note(by, "end_election")).await.unwrap()
  else {
    panic!("expected the election to close");
  };
  assert_eq!(closed.status, ElectionStatus::Completed);

  assert_eq!(
    s.close_election(e, note(by, "end_election")).await.unwrap(),
    ClosingOutcome::AlreadyClosed
  );
  assert_eq!(
    s.close_election(ElectionId(999), note(by, "end_election")).await.unwrap(),
    ClosingOutcome::NotFound
  );

  let actions: Vec<_> =
    s.list_audit_logs(e).await.unwrap().into_iter().map(|l| l.action).collect();
  assert_eq!(actions, vec!["create_election", "end_election"]);
}

#[tokio::test]
async fn concurrent_closes_have_one_winner() {
  let s = store().await;
  let by = officer(&s).await;
  for round in 0..10 {
    let e = election(&s, &format!("Board {round}"), &["A"]).await;
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let s = s.clone();
        tokio::spawn(async move { s.close_election(e, note(by, "end_election")).await })
      })
      .collect();
    let mut closed = 0;
    for h in handles {
      match h.await.unwrap().unwrap() {
        ClosingOutcome::Closed(_) => closed += 1,
        outcome => assert_eq!(outcome, ClosingOutcome::AlreadyClosed),
      }
    }
    assert_eq!(closed, 1);
    assert_eq!(s.list_audit_logs(e).await.unwrap().len(), 2);
  }
}

#[tokio::test]
async fn cast_ballot_records_vote_atomically() {
  let s = store().await;
  let v = voter(&s, "v@example.com").await;
  let e = election(&s, "Board", &["A", "B"]).await;

  let outcome = s.cast_ballot(ballot(v, e, "B")).await.unwrap();
  let BallotOutcome::Recorded { vote, election_name } = outcome else {
    panic!("expected a recorded vote, got {outcome:?}");
  };
  assert_eq!(election_name, "Board");
  assert_eq!(vote.candidate, "B");

  let e = s.get_election(e).await.unwrap().unwrap();
  assert_eq!(e.vote_counts(), vec![0, 1]);
  assert!(s.get_voter(v).await.unwrap().unwrap().has_voted);

  let votes = s
    .list_votes(VoteFilter { voter_id: Some(v), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(votes, vec![vote]);
}

#[tokio::test]
async fn second_ballot_is_rejected_without_side_effects() {
  let s = store().await;
  let v = voter(&s, "v@example.com").await;
  let e = election(&s, "Board", &["A", "B"]).await;

  s.cast_ballot(ballot(v, e, "A")).await.unwrap();
  let outcome = s.cast_ballot(ballot(v, e, "B")).await.unwrap();
  assert_eq!(outcome, BallotOutcome::AlreadyVoted);

  let e = s.get_election(e).await.unwrap().unwrap();
  assert_eq!(e.vote_counts(), vec![1, 0]);
}

#[tokio::test]
async fn ballot_precondition_failures() {
  let s = store().await;
  let v = voter(&s, "v@example.com").await;
  let e = election(&s, "Board", &["A"]).await;

  assert_eq!(
    s.cast_ballot(ballot(VoterId(999), e, "A")).await.unwrap(),
    BallotOutcome::VoterNotFound
  );
  assert_eq!(
    s.cast_ballot(ballot(v, ElectionId(999), "A")).await.unwrap(),
    BallotOutcome::ElectionNotFound
  );
  assert_eq!(
    s.cast_ballot(ballot(v, e, "Nobody")).await.unwrap(),
    BallotOutcome::CandidateNotFound
  );

  // None of the failures above may have flipped the flag.
  assert!(!s.get_voter(v).await.unwrap().unwrap().has_voted);

  let by = officer(&s).await;
  s.close_election(e, note(by, "end_election")).await.unwrap();
  assert_eq!(
    s.cast_ballot(ballot(v, e, "A")).await.unwrap(),
    BallotOutcome::ElectionClosed
  );
  assert!(s.list_votes(VoteFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_ballots_lose_no_updates() {
  let s = store().await;
  let e = election(&s, "Board", &["A", "B"]).await;
  let mut voters = Vec::new();
  for i in 0..25 {
    voters.push(voter(&s, &format!("v{i}@example.com")).await);
  }

  let handles: Vec<_> = voters
    .iter()
    .map(|&v| {
      let s = s.clone();
      tokio::spawn(async move { s.cast_ballot(ballot(v, e, "A")).await })
    })
    .collect();
  for h in handles {
    assert!(matches!(h.await.unwrap().unwrap(), BallotOutcome::Recorded { .. }));
  }

  let e = s.get_election(e).await.unwrap().unwrap();
  assert_eq!(e.vote_counts(), vec![25, 0]);
}

#[tokio::test]
async fn concurrent_double_vote_counts_once() {
  let s = store().await;
  let v = voter(&s, "v@example.com").await;
  let e = election(&s, "Board", &["A"]).await;

  let handles: Vec<_> = (0..10)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { s.cast_ballot(ballot(v, e, "A")).await })
    })
    .collect();
  let mut recorded = 0;
  for h in handles {
    if let BallotOutcome::Recorded { .. } = h.await.unwrap().unwrap() {
      recorded += 1;
    }
  }
  assert_eq!(recorded, 1);
  assert_eq!(s.get_election(e).await.unwrap().unwrap().total_votes(), 1);
}

// ─── Candidates, stations, observers ─────────────────────────────────────────

#[tokio::test]
async fn candidate_crud() {
  let s = store().await;
  let e = election(&s, "Board", &["Ada"]).await;
  let c = s
    .create_candidate(NewCandidate {
      name:        "Ada".into(),
      party:       Some("Analytical".into()),
      bio:         None,
      election_id: e,
    })
    .await
    .unwrap();

  let patch = CandidatePatch { bio: Some("Engine designer".into()), ..Default::default() };
  let updated = s.update_candidate(c.candidate_id, patch).await.unwrap().unwrap();
  assert_eq!(updated.bio.as_deref(), Some("Engine designer"));
  assert_eq!(updated.party.as_deref(), Some("Analytical"));

  assert_eq!(s.list_candidates(e).await.unwrap().len(), 1);
  assert!(s.delete_candidate(c.candidate_id).await.unwrap());
  assert!(!s.delete_candidate(c.candidate_id).await.unwrap());
  assert!(s.get_candidate(c.candidate_id).await.unwrap().is_none());
}

#[tokio::test]
async fn negative_capacity_is_rejected_by_the_store() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let err = s
    .create_station(NewPollingStation {
      name:        "Hall".into(),
      location:    "Main St".into(),
      election_id: e,
      capacity:    -1,
    })
    .await
    .unwrap_err();
  assert!(err.is_conflict());
}

#[tokio::test]
async fn observer_email_is_unique() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let input = NewObserver {
    name:         "Olive".into(),
    email:        "olive@example.com".into(),
    election_id:  e,
    organization: None,
  };
  s.create_observer(input.clone()).await.unwrap();
  assert!(s.create_observer(input).await.unwrap_err().is_conflict());
  assert_eq!(s.list_observers(Some(e)).await.unwrap().len(), 1);
}

// ─── Feedback and audit ──────────────────────────────────────────────────────

#[tokio::test]
async fn feedback_filters_by_severity() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let o = s
    .create_observer(NewObserver {
      name:         "Olive".into(),
      email:        "olive@example.com".into(),
      election_id:  e,
      organization: None,
    })
    .await
    .unwrap();
  for severity in [Severity::Low, Severity::High, Severity::High] {
    s.submit_feedback(NewFeedback {
      observer_id: o.observer_id,
      election_id: e,
      description: "queue".into(),
      severity,
    })
    .await
    .unwrap();
  }

  let high = s
    .list_feedback(FeedbackFilter {
      severity: Some(Severity::High),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(high.len(), 2);
  assert!(high.iter().all(|f| f.severity == Severity::High));
}

#[tokio::test]
async fn audit_log_lists_oldest_first() {
  let s = store().await;
  let admin = s.create_user(new_user("admin@example.com", Role::Admin)).await.unwrap();
  let e = election(&s, "Board", &["A"]).await;
  for action in ["recount", "certify"] {
    s.append_audit_log(NewAuditLog {
      election_id:  e,
      performed_by: admin.user_id,
      action:       action.into(),
      details:      None,
    })
    .await
    .unwrap();
  }
  let actions: Vec<_> = s
    .list_audit_logs(e)
    .await
    .unwrap()
    .into_iter()
    .map(|l| l.action)
    .collect();
  assert_eq!(actions, vec!["create_election", "recount", "certify"]);
}

// ─── Alerts, notifications, subscriptions ────────────────────────────────────

#[tokio::test]
async fn alert_status_update() {
  let s = store().await;
  let e = election(&s, "Board", &["A"]).await;
  let alert = s
    .create_alert(NewAlert {
      election_id: e,
      alert_type:  "fraud".into(),
      message:     "ballot stuffing".into(),
    })
    .await
    .unwrap()
    .alert;
  assert_eq!(alert.status, AlertStatus::New);

  let updated = s
    .update_alert_status(alert.alert_id, AlertStatus::Resolved)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.status, AlertStatus::Resolved);

  let open = s
    .list_alerts(AlertFilter { status: Some(AlertStatus::New), ..Default::default() })
    .await
    .unwrap();
  assert!(open.is_empty());
}

#[tokio::test]
async fn notifications_mark_read() {
  let s = store().await;
  let user = s.create_user(new_user("u@example.com", Role::Voter)).await.unwrap();
  let e = election(&s, "Board", &["A"]).await;
  s.upsert_subscription(user.user_id, "fraud".into(), true).await.unwrap();
  let mut created = Vec::new();
  for message in ["one", "two"] {
    let raised = s
      .create_alert(NewAlert {
        election_id: e,
        alert_type:  "fraud".into(),
        message:     message.into(),
      })
      .await
      .unwrap();
    created.extend(raised.notifications);
  }
  assert_eq!(created.len(), 2);

  let read = s
    .mark_notification_read(created[0].notification_id)
    .await
    .unwrap()
    .unwrap();
  assert!(read.is_read);
  assert!(s.mark_notification_read(NotificationId(9999)).await.unwrap().is_none());

  assert_eq!(s.mark_all_notifications_read(user.user_id).await.unwrap(), 1);
  let listed = s.list_notifications(user.user_id).await.unwrap();
  assert_eq!(listed[0].message, "two");
  assert!(listed.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn subscription_upsert_logs_every_change() {
  let s = store().await;
  let user = s.create_user(new_user("u@example.com", Role::Voter)).await.unwrap();

  s.upsert_subscription(user.user_id, "fraud".into(), true).await.unwrap();
  let sub = s.upsert_subscription(user.user_id, "fraud".into(), false).await.unwrap();
  assert!(!sub.is_subscribed);
  assert_eq!(s.list_subscriptions(user.user_id).await.unwrap().len(), 1);

  let e = election(&s, "Board", &["A"]).await;
  let raised = s
    .create_alert(NewAlert { election_id: e, alert_type: "fraud".into(), message: "m".into() })
    .await
    .unwrap();
  assert!(raised.notifications.is_empty());

  let events = s.list_subscription_events(user.user_id).await.unwrap();
  assert_eq!(events.len(), 2);
  assert_eq!(events[0].old_value, None);
  assert_eq!(events[1].old_value, Some(true));
  assert!(!events[1].new_value);
}
