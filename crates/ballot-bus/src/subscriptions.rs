//! Per-user alert subscriptions and their change history.

use std::collections::BTreeMap;

use ballot_core::{
  Result,
  alert::{Subscription, SubscriptionChange},
  id::UserId,
  store::{VotingStore, store_err},
};
use serde::Serialize;

use crate::{Handle, non_blank, users::load_user};

#[derive(Debug, Clone, Copy)]
pub struct ListSubscriptions {
  pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct UpdateSubscription {
  pub user_id:       UserId,
  pub alert_type:    String,
  pub is_subscribed: bool,
}

/// Apply several changes in order and return the user's full subscription
/// list afterwards.
#[derive(Debug, Clone)]
pub struct BulkUpdateSubscriptions {
  pub user_id: UserId,
  pub changes: Vec<SubscriptionChange>,
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionAnalytics {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertTypeActivity {
  pub alert_type:     String,
  pub total_changes:  i64,
  pub enabled_count:  i64,
  pub disabled_count: i64,
}

commands! {
  UpdateSubscription => Subscription;
  BulkUpdateSubscriptions => Vec<Subscription>;
}

queries! {
  ListSubscriptions => Vec<Subscription>;
  SubscriptionAnalytics => Vec<AlertTypeActivity>;
}

async fn upsert<S: VotingStore>(
  store: &S,
  user_id: UserId,
  change: SubscriptionChange,
) -> Result<Subscription> {
  let alert_type = non_blank(change.alert_type, "Alert type")?;
  store
    .upsert_subscription(user_id, alert_type, change.is_subscribed)
    .await
    .map_err(store_err)
}

impl<S: VotingStore> Handle<S> for ListSubscriptions {
  async fn handle(self, store: &S) -> Result<Vec<Subscription>> {
    load_user(store, self.user_id).await?;
    store
      .list_subscriptions(self.user_id)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for UpdateSubscription {
  async fn handle(self, store: &S) -> Result<Subscription> {
    load_user(store, self.user_id).await?;
    let change = SubscriptionChange {
      alert_type:    self.alert_type,
      is_subscribed: self.is_subscribed,
    };
    let subscription = upsert(store, self.user_id, change).await?;
    tracing::debug!(
      user_id = %self.user_id,
      alert_type = %subscription.alert_type,
      is_subscribed = subscription.is_subscribed,
      "subscription updated"
    );
    Ok(subscription)
  }
}

impl<S: VotingStore> Handle<S> for BulkUpdateSubscriptions {
  async fn handle(self, store: &S) -> Result<Vec<Subscription>> {
    load_user(store, self.user_id).await?;
    let changed = self.changes.len();
    for change in self.changes {
      upsert(store, self.user_id, change).await?;
    }
    tracing::info!(user_id = %self.user_id, changed, "subscriptions updated");
    store
      .list_subscriptions(self.user_id)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for SubscriptionAnalytics {
  async fn handle(self, store: &S) -> Result<Vec<AlertTypeActivity>> {
    load_user(store, self.user_id).await?;
    let events = store
      .list_subscription_events(self.user_id)
      .await
      .map_err(store_err)?;

    let mut by_type: BTreeMap<String, AlertTypeActivity> = BTreeMap::new();
    for event in events {
      let activity = by_type
        .entry(event.alert_type.clone())
        .or_insert_with(|| AlertTypeActivity {
          alert_type: event.alert_type,
          ..Default::default()
        });
      activity.total_changes += 1;
      if event.new_value {
        activity.enabled_count += 1;
      } else {
        activity.disabled_count += 1;
      }
    }
    Ok(by_type.into_values().collect())
  }
}
