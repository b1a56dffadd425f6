//! # Notification Outbox Repository
//!
//! Queues notifications so delivery can be retried without ever blocking or
//! failing the operation that produced them.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Notification Outbox                                  │
//! │                                                                         │
//! │  LOCAL OPERATION (e.g., record_out)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT stock change + movement                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO notification_outbox (audience, message, priority)         │
//! │       (best effort: a failure here is logged, never surfaced)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            OUTBOX DISPATCHER (async)                            │   │
//! │  │                                                                 │   │
//! │  │  1. SELECT * FROM notification_outbox                          │   │
//! │  │     WHERE delivered_at IS NULL AND attempts < max              │   │
//! │  │                                                                 │   │
//! │  │  2. For each entry:                                            │   │
//! │  │     a. Hand to the notification sink                           │   │
//! │  │     b. On success: delivered_at = NOW()                        │   │
//! │  │     c. On failure: attempts += 1, last_error = ?               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use shelf_core::{Audience, Notification, Priority};

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxEntry {
    pub id: String,
    /// Rendered [`Audience`] (`role:MANAGER`, `user:acme@example.com`).
    pub audience: String,
    pub message: String,
    pub priority: Priority,
    /// Failed delivery attempts so far.
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Rebuilds the notification this entry was queued from.
    pub fn notification(&self) -> DbResult<Notification> {
        let audience: Audience = self
            .audience
            .parse()
            .map_err(|e| DbError::Internal(format!("outbox entry {}: {}", self.id, e)))?;
        Ok(Notification::new(audience, self.message.clone(), self.priority))
    }
}

/// Repository for the notification outbox.
#[derive(Debug, Clone)]
pub struct NotificationOutboxRepository {
    pool: SqlitePool,
}

impl NotificationOutboxRepository {
    /// Creates a new NotificationOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationOutboxRepository { pool }
    }

    /// Queues a notification for delivery.
    pub async fn enqueue(&self, notification: &Notification) -> DbResult<OutboxEntry> {
        debug!(
            audience = %notification.audience,
            priority = ?notification.priority,
            "Queuing notification"
        );

        let entry = OutboxEntry {
            id: generate_id(),
            audience: notification.audience.to_string(),
            message: notification.message.clone(),
            priority: notification.priority,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            delivered_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO notification_outbox (
                id, audience, message, priority,
                attempts, last_error, created_at, attempted_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.audience)
        .bind(&entry.message)
        .bind(entry.priority)
        .bind(entry.attempts)
        .bind(&entry.last_error)
        .bind(entry.created_at)
        .bind(entry.attempted_at)
        .bind(entry.delivered_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets undelivered entries that still have attempts left, oldest first.
    pub async fn get_pending(&self, limit: u32, max_attempts: u32) -> DbResult<Vec<OutboxEntry>> {
        let entries = sqlx::query_as::<_, OutboxEntry>(
            r#"
            SELECT * FROM notification_outbox
            WHERE delivered_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered.
    pub async fn mark_delivered(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE notification_outbox SET delivered_at = ?2, attempted_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a delivery failure.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE notification_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts undelivered entries (including ones out of attempts).
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notification_outbox WHERE delivered_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries delivered more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_delivered(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM notification_outbox WHERE delivered_at IS NOT NULL AND delivered_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
