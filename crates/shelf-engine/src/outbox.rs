//! # Notification Outbox Dispatcher
//!
//! Drains the notification_outbox table into a [`NotificationSink`].
//!
//! ## Dispatch Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Dispatcher Flow                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 notification_outbox Table                       │   │
//! │  │                                                                 │   │
//! │  │  id | audience     | message  | attempts | delivered_at        │   │
//! │  │  ───┼──────────────┼──────────┼──────────┼─────────────────────│   │
//! │  │  1  │ role:MANAGER │ Low ...  │ 0        │ NULL                │   │
//! │  │  2  │ user:a@b.c   │ New PO.. │ 2        │ NULL                │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    OutboxDispatcher                             │   │
//! │  │                                                                 │   │
//! │  │  1. Poll: pending entries with attempts < max_attempts,        │   │
//! │  │           oldest first, LIMIT batch_size                       │   │
//! │  │                                                                 │   │
//! │  │  2. Deliver: sink.deliver(notification), one at a time         │   │
//! │  │                                                                 │   │
//! │  │  3. Mark: delivered_at = NOW()  or  attempts += 1, last_error  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  TIMING:                                                               │
//! │  • Poll interval: 5 seconds (configurable)                             │
//! │  • Batch size: 100 entries (configurable)                              │
//! │  • Max attempts: 10 (then logged and left alone)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shelf_core::{Notification, Priority};
use shelf_db::{Database, OutboxEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::OutboxSettings;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Sink
// =============================================================================

/// Where notifications finally go (email, chat, a message bus...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification. An error leaves the entry pending.
    async fn deliver(&self, notification: &Notification) -> EngineResult<()>;
}

/// Sink that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> EngineResult<()> {
        match notification.priority {
            Priority::High => warn!(
                audience = %notification.audience,
                "{}", notification.message
            ),
            Priority::Normal => info!(
                audience = %notification.audience,
                "{}", notification.message
            ),
        }
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers pending outbox entries through a sink.
pub struct OutboxDispatcher {
    db: Database,
    sink: Arc<dyn NotificationSink>,
    settings: OutboxSettings,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running dispatcher.
#[derive(Clone)]
pub struct OutboxDispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl OutboxDispatcherHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| EngineError::ChannelError("Shutdown channel closed".into()))
    }
}

impl OutboxDispatcher {
    /// Creates a dispatcher and its handle.
    pub fn new(
        db: Database,
        sink: Arc<dyn NotificationSink>,
        settings: OutboxSettings,
    ) -> (Self, OutboxDispatcherHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let dispatcher = OutboxDispatcher {
            db,
            sink,
            settings,
            shutdown_rx,
        };

        (dispatcher, OutboxDispatcherHandle { shutdown_tx })
    }

    /// Runs the dispatch loop until shut down.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Outbox dispatcher starting");

        let poll_interval = Duration::from_secs(self.settings.poll_interval_secs.max(1));
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch_pending().await {
                        error!(?e, "Failed to dispatch outbox batch");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Outbox dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Outbox dispatcher stopped");
    }

    /// Delivers one batch of pending entries.
    pub async fn dispatch_pending(&self) -> EngineResult<DispatchReport> {
        let outbox = self.db.outbox();
        let entries = outbox
            .get_pending(self.settings.batch_size, self.settings.max_attempts)
            .await?;

        let mut report = DispatchReport::default();
        if entries.is_empty() {
            debug!("No pending notifications");
            return Ok(report);
        }

        debug!(count = entries.len(), "Dispatching notifications");

        for entry in entries {
            match self.deliver(&entry).await {
                Ok(()) => {
                    outbox.mark_delivered(&entry.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    outbox.mark_failed(&entry.id, &message).await?;
                    report.failed += 1;

                    if entry.attempts + 1 >= i64::from(self.settings.max_attempts) {
                        warn!(
                            id = %entry.id,
                            audience = %entry.audience,
                            attempts = entry.attempts + 1,
                            error = %message,
                            "Notification exceeded max delivery attempts"
                        );
                    } else {
                        warn!(id = %entry.id, error = %message, "Notification delivery failed");
                    }
                }
            }
        }

        if report.delivered > 0 || report.failed > 0 {
            info!(
                delivered = report.delivered,
                failed = report.failed,
                "Outbox batch dispatched"
            );
        }

        Ok(report)
    }

    async fn deliver(&self, entry: &OutboxEntry) -> EngineResult<()> {
        let notification = entry.notification()?;
        self.sink.deliver(&notification).await
    }
}

// =============================================================================
// Tests
// =============================================================================
