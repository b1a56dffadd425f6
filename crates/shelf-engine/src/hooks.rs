//! # Post-Commit Hooks
//!
//! Side effects that run after a primary mutation has committed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Post-Commit Dispatch                               │
//! │                                                                         │
//! │  Ledger / OrderService                                                  │
//! │       │  commit                                                         │
//! │       ▼                                                                 │
//! │  Committed { value, effects: [Notify, LowStock, ...] }                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HookDispatcher::dispatch (FIFO queue)                                  │
//! │       │                                                                 │
//! │       ├── Notify(n)    ──► Notifier::notify ──► notification_outbox    │
//! │       │                                                                 │
//! │       └── LowStock(s)  ──► OrderService::auto_generate                  │
//! │                               │  its own effects are queued behind     │
//! │                               ▼                                         │
//! │                           Notify(order created) ...                     │
//! │                                                                         │
//! │  Every failure here is logged and counted. None of them can reach      │
//! │  back into the transaction that already committed.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use shelf_core::{CoreError, LowStockSignal, Notification, PurchaseOrder};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::notify::Notifier;
use crate::orders::OrderService;

// =============================================================================
// Effects
// =============================================================================

/// A side effect queued by a committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostCommit {
    Notify(Notification),
    LowStock(LowStockSignal),
}

/// The committed result of a mutation and the effects still to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub effects: Vec<PostCommit>,
}

impl<T> Committed<T> {
    pub fn new(value: T) -> Self {
        Committed {
            value,
            effects: Vec::new(),
        }
    }

    pub fn with_effects(value: T, effects: Vec<PostCommit>) -> Self {
        Committed { value, effects }
    }

    /// The low-stock signal among the effects, if any.
    pub fn low_stock(&self) -> Option<&LowStockSignal> {
        self.effects.iter().find_map(|effect| match effect {
            PostCommit::LowStock(signal) => Some(signal),
            PostCommit::Notify(_) => None,
        })
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.effects.iter().filter_map(|effect| match effect {
            PostCommit::Notify(n) => Some(n),
            PostCommit::LowStock(_) => None,
        })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            effects: self.effects,
        }
    }

    pub fn into_parts(self) -> (T, Vec<PostCommit>) {
        (self.value, self.effects)
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// What happened while dispatching a set of effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookReport {
    /// The first low-stock signal seen.
    pub low_stock: Option<LowStockSignal>,

    /// Orders created in response to low stock.
    pub auto_orders: Vec<PurchaseOrder>,

    /// Notifications queued in the outbox.
    pub queued: usize,

    /// Effects that failed (already logged).
    pub failed: usize,
}

/// Runs post-commit effects with independent failure handling.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    orders: OrderService,
    notifier: Notifier,
    auto_generate: bool,
}

impl HookDispatcher {
    pub fn new(orders: OrderService, notifier: Notifier, auto_generate: bool) -> Self {
        HookDispatcher {
            orders,
            notifier,
            auto_generate,
        }
    }

    /// Runs every effect in order. Never fails.
    pub async fn dispatch(&self, effects: Vec<PostCommit>) -> HookReport {
        let mut report = HookReport::default();
        let mut queue: VecDeque<PostCommit> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                PostCommit::Notify(notification) => {
                    if self.notifier.notify(&notification).await {
                        report.queued += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                PostCommit::LowStock(signal) => {
                    if report.low_stock.is_none() {
                        report.low_stock = Some(signal.clone());
                    }

                    if !self.auto_generate {
                        debug!(product_id = %signal.product_id, "Auto-generation disabled, skipping");
                        continue;
                    }

                    match self.orders.auto_generate(&signal).await {
                        Ok(committed) => {
                            let (order, effects) = committed.into_parts();
                            queue.extend(effects);
                            report.auto_orders.push(order);
                        }
                        Err(EngineError::Core(e @ CoreError::DependencyUnavailable { .. })) => {
                            warn!(
                                product_id = %signal.product_id,
                                reason = %e,
                                "Auto-generation skipped"
                            );
                        }
                        Err(e) => {
                            warn!(
                                product_id = %signal.product_id,
                                error = %e,
                                "Auto-generation failed"
                            );
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        report
    }
}
