//! Alerts, notifications, and subscriptions.

use ballot_core::{
  alert::{
    Alert, AlertRaised, AlertStatus, NewAlert, Notification, Subscription,
    SubscriptionEvent,
  },
  id::{AlertId, NotificationId, UserId},
  store::{
    AlertFilter, AlertRepository, NotificationRepository, SubscriptionRepository,
  },
};
use rusqlite::OptionalExtension as _;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    RawAlert, RawNotification, RawSubscription, RawSubscriptionEvent, encode_dt,
    now,
  },
};

fn select_alert(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawAlert>> {
  conn
    .query_row(
      &format!("SELECT {} FROM alerts WHERE alert_id = ?1", RawAlert::COLUMNS),
      [id],
      RawAlert::from_row,
    )
    .optional()
}

fn select_notification(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawNotification>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM notifications WHERE notification_id = ?1",
        RawNotification::COLUMNS
      ),
      [id],
      RawNotification::from_row,
    )
    .optional()
}

// ─── AlertRepository ─────────────────────────────────────────────────────────

impl AlertRepository for SqliteStore {
  async fn create_alert(&self, input: NewAlert) -> Result<AlertRaised> {
    let created_at = now();
    let at_str = encode_dt(created_at);
    let row = input.clone();

    let (id, notified) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO alerts
             (election_id, alert_type, message, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![
            row.election_id.0,
            row.alert_type,
            row.message,
            AlertStatus::New.as_ref(),
            at_str,
          ],
        )?;
        let alert_id = tx.last_insert_rowid();

        let recipients = {
          let mut stmt = tx.prepare(
            "SELECT user_id FROM subscriptions
             WHERE alert_type = ?1 AND is_subscribed = 1
             ORDER BY user_id",
          )?;
          stmt
            .query_map([&row.alert_type], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut notified = Vec::with_capacity(recipients.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO notifications (alert_id, user_id, message, is_read, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
          )?;
          for user_id in recipients {
            stmt.execute(rusqlite::params![alert_id, user_id, row.message, at_str])?;
            notified.push((tx.last_insert_rowid(), user_id));
          }
        }
        tx.commit()?;
        Ok((alert_id, notified))
      })
      .await?;

    let alert_id = AlertId(id);
    let notifications = notified
      .into_iter()
      .map(|(notification_id, user_id)| Notification {
        notification_id: NotificationId(notification_id),
        alert_id,
        user_id: UserId(user_id),
        message: input.message.clone(),
        is_read: false,
        created_at,
      })
      .collect();

    Ok(AlertRaised {
      alert: Alert {
        alert_id,
        election_id: input.election_id,
        alert_type: input.alert_type,
        message: input.message,
        status: AlertStatus::New,
        created_at,
        updated_at: created_at,
      },
      notifications,
    })
  }

  async fn get_alert(&self, id: AlertId) -> Result<Option<Alert>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_alert(conn, id.0)?))
      .await?;
    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
    let election_id = filter.election_id.map(|e| e.0);
    let status = filter.status.map(|s| s.to_string());

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM alerts
           WHERE (?1 IS NULL OR election_id = ?1)
             AND (?2 IS NULL OR status = ?2)
           ORDER BY alert_id DESC",
          RawAlert::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![election_id, status], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  async fn update_alert_status(
    &self,
    id: AlertId,
    status: AlertStatus,
  ) -> Result<Option<Alert>> {
    let at_str = encode_dt(now());

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE alerts SET status = ?2, updated_at = ?3 WHERE alert_id = ?1",
          rusqlite::params![id.0, status.as_ref(), at_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_alert(conn, id.0)?)
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }
}

// ─── NotificationRepository ──────────────────────────────────────────────────

impl NotificationRepository for SqliteStore {
  async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_notification(conn, id.0)?))
      .await?;
    raw.map(RawNotification::into_notification).transpose()
  }

  async fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM notifications
           WHERE user_id = ?1
           ORDER BY notification_id DESC",
          RawNotification::COLUMNS
        ))?;
        let rows = stmt
          .query_map([user_id.0], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notification_read(
    &self,
    id: NotificationId,
  ) -> Result<Option<Notification>> {
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1",
          [id.0],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_notification(conn, id.0)?)
      })
      .await?;
    raw.map(RawNotification::into_notification).transpose()
  }

  async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
          [user_id.0],
        )?)
      })
      .await?;
    Ok(changed as u64)
  }
}

// ─── SubscriptionRepository ──────────────────────────────────────────────────

impl SubscriptionRepository for SqliteStore {
  async fn list_subscriptions(&self, user_id: UserId) -> Result<Vec<Subscription>> {
    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM subscriptions
           WHERE user_id = ?1
           ORDER BY alert_type",
          RawSubscription::COLUMNS
        ))?;
        let rows = stmt
          .query_map([user_id.0], RawSubscription::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }

  async fn upsert_subscription(
    &self,
    user_id: UserId,
    alert_type: String,
    is_subscribed: bool,
  ) -> Result<Subscription> {
    let at_str = encode_dt(now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let old_value: Option<bool> = tx
          .query_row(
            "SELECT is_subscribed FROM subscriptions
             WHERE user_id = ?1 AND alert_type = ?2",
            rusqlite::params![user_id.0, alert_type],
            |row| row.get(0),
          )
          .optional()?;

        tx.execute(
          "INSERT INTO subscriptions
             (user_id, alert_type, is_subscribed, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT (user_id, alert_type) DO UPDATE SET
             is_subscribed = excluded.is_subscribed,
             updated_at    = excluded.updated_at",
          rusqlite::params![user_id.0, alert_type, is_subscribed, at_str],
        )?;

        tx.execute(
          "INSERT INTO subscription_events
             (user_id, alert_type, old_value, new_value, changed_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![user_id.0, alert_type, old_value, is_subscribed, at_str],
        )?;

        let raw = tx.query_row(
          &format!(
            "SELECT {} FROM subscriptions WHERE user_id = ?1 AND alert_type = ?2",
            RawSubscription::COLUMNS
          ),
          rusqlite::params![user_id.0, alert_type],
          RawSubscription::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_subscription()
  }

  async fn list_subscription_events(
    &self,
    user_id: UserId,
  ) -> Result<Vec<SubscriptionEvent>> {
    let raws: Vec<RawSubscriptionEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, alert_type, old_value, new_value, changed_at
           FROM subscription_events
           WHERE user_id = ?1
           ORDER BY event_id",
        )?;
        let rows = stmt
          .query_map([user_id.0], RawSubscriptionEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscriptionEvent::into_event).collect()
  }
}
