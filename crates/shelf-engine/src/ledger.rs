//! # Stock Ledger
//!
//! Owns every change to `Product.quantity`. Each change is written together
//! with exactly one immutable [`StockMovement`], in one transaction.
//!
//! ## Record Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_out(product, 5)                               │
//! │                                                                         │
//! │  validate quantity (> 0)            ── InvalidQuantity                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock(product_id)                   ← same product: strictly serialized │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────── TRANSACTION ─────────────────────────────┐     │
//! │  │ UPDATE products SET quantity = quantity - 5                   │     │
//! │  │ WHERE id = ? AND quantity - 5 >= 0 RETURNING *                │     │
//! │  │     no row → ProductNotFound / InsufficientStock { available }│     │
//! │  │ INSERT INTO stock_movements (...)                             │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │       │ COMMIT                                                          │
//! │       ▼                                                                 │
//! │  effects: Notify(managers) [+ LowStock + Notify(HIGH)]                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HookDispatcher (after commit; failures never unwind the movement)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_core::validation::validate_movement_quantity;
use shelf_core::{Actor, CoreError, LowStockSignal, MovementDirection, Product, StockMovement};
use shelf_db::{generate_id, Database, MovementRepository, ProductRepository, StockUpdate};
use sqlx::SqliteConnection;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::hooks::{Committed, PostCommit};
use crate::locks::KeyedLocks;
use crate::notify;

/// A committed quantity change and the movement that explains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockChange {
    /// The product as it was right after the change.
    pub product: Product,
    pub movement: StockMovement,
}

/// The stock ledger service.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    locks: KeyedLocks,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Ledger {
            db,
            locks: KeyedLocks::new(),
        }
    }

    /// Receives stock.
    ///
    /// ## Errors
    /// * `InvalidQuantity` - quantity ≤ 0
    /// * `NotFound` - unknown product
    pub async fn record_in(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<Committed<StockChange>> {
        self.record(product_id, MovementDirection::In, quantity, notes, actor).await
    }

    /// Consumes stock.
    ///
    /// When the resulting quantity is at or below the product's reorder
    /// level the result carries a [`PostCommit::LowStock`] effect.
    ///
    /// ## Errors
    /// * `InvalidQuantity` - quantity ≤ 0
    /// * `NotFound` - unknown product
    /// * `InsufficientStock` - quantity exceeds what is on hand
    pub async fn record_out(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<Committed<StockChange>> {
        self.record(product_id, MovementDirection::Out, quantity, notes, actor).await
    }

    async fn record(
        &self,
        product_id: &str,
        direction: MovementDirection,
        quantity: i64,
        notes: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<Committed<StockChange>> {
        validate_movement_quantity(quantity)?;

        let _guard = self.lock_product(product_id).await;

        let mut tx = self.db.begin().await?;
        let change = Self::apply_movement(
            &mut tx,
            product_id,
            direction,
            quantity,
            notes,
            &actor.identity,
            Utc::now(),
        )
        .await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            direction = %direction,
            quantity = quantity,
            new_quantity = change.product.quantity,
            actor = %actor.identity,
            "Stock movement recorded"
        );

        Ok(Self::effects_for(change))
    }

    /// Holds the per-product lock. Anything that writes movements for
    /// `product_id` outside [`Ledger::record_in`]/[`Ledger::record_out`] takes it first.
    pub async fn lock_product(&self, product_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(product_id).await
    }

    /// Adjusts quantity and appends the movement on an open transaction.
    ///
    /// The conditional update is the first write, so the transaction holds
    /// the write lock from here on. Callers commit.
    pub async fn apply_movement(
        conn: &mut SqliteConnection,
        product_id: &str,
        direction: MovementDirection,
        quantity: i64,
        notes: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<StockChange> {
        let delta = match direction {
            MovementDirection::In => quantity,
            MovementDirection::Out => -quantity,
        };

        let product = match ProductRepository::try_adjust_quantity(conn, product_id, delta, now).await? {
            StockUpdate::Applied(product) => product,
            StockUpdate::Missing => return Err(CoreError::not_found("Product", product_id).into()),
            StockUpdate::Insufficient { available } => {
                debug!(product_id = %product_id, available, requested = quantity, "Insufficient stock");
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available,
                    requested: quantity,
                }
                .into());
            }
        };

        let movement = StockMovement {
            id: generate_id(),
            product_id: product_id.to_string(),
            direction,
            quantity,
            notes: notes.map(str::to_string).filter(|n| !n.trim().is_empty()),
            actor: actor.to_string(),
            occurred_at: now,
        };
        MovementRepository::insert(conn, &movement).await?;

        Ok(StockChange { product, movement })
    }

    /// Post-commit effects of a committed change.
    pub(crate) fn effects_for(change: StockChange) -> Committed<StockChange> {
        let mut effects = vec![PostCommit::Notify(notify::stock_moved(&change.product, &change.movement))];

        if let Some(signal) = low_stock_signal(&change) {
            effects.push(PostCommit::Notify(notify::low_stock(&change.product, &signal)));
            effects.push(PostCommit::LowStock(signal));
        }

        Committed::with_effects(change, effects)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Ledger history for analytics, oldest first.
    pub async fn history(
        &self,
        product_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.movements().history(product_id, since).await?)
    }

    /// Most recent movements for audit display, newest first.
    pub async fn movements(&self, product_id: &str, limit: u32) -> EngineResult<Vec<StockMovement>> {
        if self.db.products().get_by_id(product_id).await?.is_none() {
            return Err(CoreError::not_found("Product", product_id).into());
        }
        Ok(self.db.movements().recent(product_id, limit).await?)
    }
}

/// A stock-out that leaves the product at or below its reorder level.
fn low_stock_signal(change: &StockChange) -> Option<LowStockSignal> {
    let product = &change.product;
    (change.movement.direction == MovementDirection::Out && product.is_low_stock()).then(|| {
        LowStockSignal {
            product_id: product.id.clone(),
            new_quantity: product.quantity,
            reorder_level: product.reorder_level,
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use shelf_core::ErrorKind;
    use shelf_db::{DbConfig, NewProduct};

    async fn setup(reorder_level: i64) -> (Database, Ledger, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(NewProduct::new("MILK-1L", "Milk 1L").reorder(reorder_level, 20))
            .await
            .unwrap();
        (db.clone(), Ledger::new(db), product)
    }

    fn alice() -> Actor {
        Actor::manager("alice")
    }

    #[tokio::test]
    async fn test_record_in_then_out() {
        let (db, ledger, product) = setup(10).await;

        let received = ledger.record_in(&product.id, 50, Some("delivery"), &alice()).await.unwrap();
        assert_eq!(received.value.product.quantity, 50);
        assert_eq!(received.value.movement.direction, MovementDirection::In);
        assert_eq!(received.value.movement.notes.as_deref(), Some("delivery"));
        assert!(received.low_stock().is_none());

        let sold = ledger.record_out(&product.id, 50, None, &alice()).await.unwrap();
        assert_eq!(sold.value.product.quantity, 0);
        assert_eq!(db.movements().net_quantity(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected_before_any_write() {
        let (db, ledger, product) = setup(10).await;

        for qty in [0, -3] {
            let err = ledger.record_in(&product.id, qty, None, &alice()).await.unwrap_err();
            assert!(matches!(err, EngineError::Core(CoreError::InvalidQuantity { quantity }) if quantity == qty));
        }
        assert_eq!(db.movements().count_for_product(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (_db, ledger, _product) = setup(10).await;
        let err = ledger.record_out("ghost", 1, None, &alice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_available_and_changes_nothing() {
        let (db, ledger, product) = setup(10).await;
        ledger.record_in(&product.id, 3, None, &alice()).await.unwrap();

        let err = ledger.record_out(&product.id, 5, None, &alice()).await.unwrap_err();
        match err {
            EngineError::Core(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 3);
        assert_eq!(db.movements().count_for_product(&product.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_low_stock_signal_is_inclusive() {
        let (_db, ledger, product) = setup(10).await;
        ledger.record_in(&product.id, 15, None, &alice()).await.unwrap();

        let above = ledger.record_out(&product.id, 4, None, &alice()).await.unwrap();
        assert!(above.low_stock().is_none());

        let at_level = ledger.record_out(&product.id, 1, None, &alice()).await.unwrap();
        let signal = at_level.low_stock().unwrap();
        assert_eq!(signal.new_quantity, 10);
        assert_eq!(signal.reorder_level, 10);
        // Low-stock alert plus the regular movement notice
        assert_eq!(at_level.notifications().count(), 2);
    }

    #[tokio::test]
    async fn test_stock_in_never_signals_low_stock() {
        let (_db, ledger, product) = setup(10).await;
        let received = ledger.record_in(&product.id, 2, None, &alice()).await.unwrap();
        assert!(received.value.product.is_low_stock());
        assert!(received.low_stock().is_none());
    }

    #[tokio::test]
    async fn test_movements_listing() {
        let (_db, ledger, product) = setup(10).await;
        ledger.record_in(&product.id, 5, None, &alice()).await.unwrap();
        ledger.record_out(&product.id, 2, None, &alice()).await.unwrap();

        let recent = ledger.movements(&product.id, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(ledger.history(&product.id, None).await.unwrap().len(), 2);
        assert_eq!(
            ledger.movements("ghost", 10).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
