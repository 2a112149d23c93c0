//! A user's notification inbox.

use ballot_core::{
  Entity, Error, Result,
  alert::Notification,
  id::{NotificationId, UserId},
  store::{VotingStore, store_err},
};
use serde::Serialize;

use crate::{Handle, users::load_user};

#[derive(Debug, Clone, Copy)]
pub struct GetNotification {
  pub notification_id: NotificationId,
}

#[derive(Debug, Clone, Copy)]
pub struct ListNotifications {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationSummary {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Copy)]
pub struct MarkNotificationRead {
  pub notification_id: NotificationId,
}

#[derive(Debug, Clone, Copy)]
pub struct MarkAllNotificationsRead {
  pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InboxSummary {
  pub total:  i64,
  pub unread: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkedRead {
  pub updated: u64,
}

commands! {
  MarkNotificationRead => Notification;
  MarkAllNotificationsRead => MarkedRead;
}

queries! {
  GetNotification => Notification;
  ListNotifications => Vec<Notification>;
  NotificationSummary => InboxSummary;
}

impl<S: VotingStore> Handle<S> for GetNotification {
  async fn handle(self, store: &S) -> Result<Notification> {
    store
      .get_notification(self.notification_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::not_found(Entity::Notification, self.notification_id))
  }
}

impl<S: VotingStore> Handle<S> for ListNotifications {
  async fn handle(self, store: &S) -> Result<Vec<Notification>> {
    load_user(store, self.user_id).await?;
    store
      .list_notifications(self.user_id)
      .await
      .map_err(store_err)
  }
}

impl<S: VotingStore> Handle<S> for NotificationSummary {
  async fn handle(self, store: &S) -> Result<InboxSummary> {
    load_user(store, self.user_id).await?;
    let inbox = store
      .list_notifications(self.user_id)
      .await
      .map_err(store_err)?;
    Ok(InboxSummary {
      total:  inbox.len() as i64,
      unread: inbox.iter().filter(|n| !n.is_read).count() as i64,
    })
  }
}

impl<S: VotingStore> Handle<S> for MarkNotificationRead {
  async fn handle(self, store: &S) -> Result<Notification> {
    store
      .mark_notification_read(self.notification_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::not_found(Entity::Notification, self.notification_id))
  }
}

impl<S: VotingStore> Handle<S> for MarkAllNotificationsRead {
  async fn handle(self, store: &S) -> Result<MarkedRead> {
    load_user(store, self.user_id).await?;
    let updated = store
      .mark_all_notifications_read(self.user_id)
      .await
      .map_err(store_err)?;
    tracing::debug!(user_id = %self.user_id, updated, "notifications marked read");
    Ok(MarkedRead { updated })
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::ErrorKind;

  use super::*;
  use crate::{alerts::CreateAlert, subscriptions::UpdateSubscription, testing};

  #[tokio::test]
  async fn marking_unknown_notification_is_not_found() {
    let bus = testing::bus().await;
    let err = bus
      .execute(MarkNotificationRead { notification_id: NotificationId(9999) })
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Notification with ID 9999 not found.");
  }

  #[tokio::test]
  async fn inbox_lifecycle() {
    let bus = testing::bus().await;
    let admin = testing::admin(&bus).await;
    let election = testing::election(&bus, &admin, "Board", &["A"]).await;
    let user_id = testing::voter(&bus, "v@example.com").await.voter.user_id;

    bus
      .execute(UpdateSubscription { user_id, alert_type: "fraud".into(), is_subscribed: true })
      .await
      .unwrap();
    for message in ["first", "second", "third"] {
      bus
        .execute(CreateAlert {
          election_id: election.election_id,
          alert_type:  "fraud".into(),
          message:     message.into(),
        })
        .await
        .unwrap();
    }

    let inbox = bus.ask(ListNotifications { user_id }).await.unwrap();
    assert_eq!(inbox.len(), 3);
    assert_eq!(inbox[0].message, "third");

    let read = bus
      .execute(MarkNotificationRead { notification_id: inbox[2].notification_id })
      .await
      .unwrap();
    assert!(read.is_read);
    assert_eq!(
      bus.ask(NotificationSummary { user_id }).await.unwrap(),
      InboxSummary { total: 3, unread: 2 }
    );

    let marked = bus.execute(MarkAllNotificationsRead { user_id }).await.unwrap();
    assert_eq!(marked.updated, 2);
    assert_eq!(
      bus.ask(NotificationSummary { user_id }).await.unwrap().unread,
      0
    );
  }
}
