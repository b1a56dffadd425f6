//! # Purchase-Order Service
//!
//! Runs the transition table from `shelf_core::order` against stored orders.
//!
//! ## Transition Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    approve / reject / accept / dispatch                 │
//! │                                                                         │
//! │  lock(order_id)                     ← same order: strictly serialized  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  read order ── NotFound                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  check_transition(order, event, actor, policy)                         │
//! │       │  Forbidden first, then InvalidTransition                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────── TRANSACTION ─────────────────────────┐       │
//! │  │ UPDATE ... SET status = <to> WHERE id = ? AND status = <read>│       │
//! │  │   no row → re-read → InvalidTransition { current }           │       │
//! │  └──────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  complete additionally holds the product lock and appends the IN       │
//! │  movement inside the same transaction as the status change.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shelf_core::order::{
    authorize_create, check_delete, check_transition, completion_note, format_order_number,
    rejection_note,
};
use shelf_core::validation::{validate_order_quantity, validate_reason};
use shelf_core::{
    AcceptPolicy, Actor, CoreError, LowStockSignal, MovementDirection, Notification, OrderEvent,
    OrderStatus, Product, PurchaseOrder, Role, ValidationError, Vendor, DEFAULT_REORDER_QUANTITY,
    SYSTEM_IDENTITY,
};
use shelf_db::{Database, PurchaseOrderRepository, StatusUpdate};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::hooks::{Committed, PostCommit};
use crate::ledger::{Ledger, StockChange};
use crate::locks::KeyedLocks;
use crate::notify;

// =============================================================================
// Requests & Outcomes
// =============================================================================

/// An explicit order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to the product's assigned vendor.
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One line of a grouped order request (typically a restock suggestion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub vendor_id: Option<String>,
}

/// Why a batch line produced no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    MissingProduct,
    MissingVendor,
    InvalidQuantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedLine {
    /// Zero-based position in the request.
    pub line: usize,
    pub product_id: String,
    pub reason: SkipReason,
}

/// Result of a grouped creation: every line is either created or skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub created: Vec<PurchaseOrder>,
    pub skipped: Vec<SkippedLine>,
}

/// A completed order and the IN movement it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletion {
    pub order: PurchaseOrder,
    pub stock: StockChange,
}

// =============================================================================
// Order Service
// =============================================================================

/// Purchase-order lifecycle service.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
    ledger: Ledger,
    locks: KeyedLocks,
    policy: AcceptPolicy,
}

impl OrderService {
    /// `ledger` must be the same instance stock movements go through, so
    /// completion shares its per-product locks.
    pub fn new(db: Database, ledger: Ledger, policy: AcceptPolicy) -> Self {
        OrderService {
            db,
            ledger,
            locks: KeyedLocks::new(),
            policy,
        }
    }

    pub fn policy(&self) -> AcceptPolicy {
        self.policy
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Creates a PENDING order on behalf of staff.
    pub async fn create(&self, request: NewOrder, actor: &Actor) -> EngineResult<Committed<PurchaseOrder>> {
        authorize_create(actor)?;
        validate_order_quantity(request.quantity)?;

        let product = self.product(&request.product_id).await?;
        let vendor_id = request
            .vendor_id
            .clone()
            .or_else(|| product.vendor_id.clone())
            .ok_or_else(|| ValidationError::Required {
                field: "vendor_id".to_string(),
            })?;
        let vendor = self
            .active_vendor(&vendor_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Vendor", vendor_id.as_str()))?;

        let order = build_order(
            &product,
            &vendor,
            request.quantity,
            &actor.identity,
            request.notes.filter(|n| !n.trim().is_empty()),
            Utc::now(),
        );
        self.insert(&order).await?;

        info!(
            order_number = %order.order_number,
            product_id = %order.product_id,
            vendor = %order.vendor_contact,
            quantity = order.quantity,
            "Purchase order created"
        );

        let effects = notifications(notify::order_created(&order));
        Ok(Committed::with_effects(order, effects))
    }

    /// Creates a PENDING order for `reorder_quantity` in response to a
    /// low-stock signal.
    ///
    /// ## Errors
    /// * `DependencyUnavailable` - no vendor assigned, or it is inactive
    pub async fn auto_generate(&self, signal: &LowStockSignal) -> EngineResult<Committed<PurchaseOrder>> {
        let product = self.product(&signal.product_id).await?;

        let Some(vendor_id) = product.vendor_id.as_deref() else {
            return Err(CoreError::DependencyUnavailable {
                reason: format!("product {} has no assigned vendor", product.sku),
            }
            .into());
        };
        let vendor = self.active_vendor(vendor_id).await?.ok_or_else(|| {
            CoreError::DependencyUnavailable {
                reason: format!(
                    "vendor {} of product {} is missing or inactive",
                    vendor_id, product.sku
                ),
            }
        })?;

        let quantity = if product.reorder_quantity > 0 {
            product.reorder_quantity
        } else {
            DEFAULT_REORDER_QUANTITY
        };
        let note = format!(
            "Auto-generated: stock {} at or below reorder level {}",
            signal.new_quantity, signal.reorder_level
        );

        let order = build_order(&product, &vendor, quantity, SYSTEM_IDENTITY, Some(note), Utc::now());
        self.insert(&order).await?;

        info!(
            order_number = %order.order_number,
            product_id = %order.product_id,
            quantity = order.quantity,
            "Purchase order auto-generated on low stock"
        );

        let effects = notifications(notify::order_created(&order));
        Ok(Committed::with_effects(order, effects))
    }

    /// Creates one order per valid line, grouped by vendor, in a single
    /// transaction. Invalid lines are reported as skipped.
    pub async fn create_batch(
        &self,
        lines: Vec<BatchLine>,
        actor: &Actor,
    ) -> EngineResult<Committed<BatchOutcome>> {
        authorize_create(actor)?;

        let mut outcome = BatchOutcome::default();
        let mut by_vendor: BTreeMap<String, (Vendor, Vec<(Product, i64)>)> = BTreeMap::new();

        for (line_no, line) in lines.into_iter().enumerate() {
            let skip = |reason| SkippedLine {
                line: line_no,
                product_id: line.product_id.clone(),
                reason,
            };

            if validate_order_quantity(line.quantity).is_err() {
                outcome.skipped.push(skip(SkipReason::InvalidQuantity));
                continue;
            }
            let Some(product) = self.db.products().get_by_id(&line.product_id).await? else {
                outcome.skipped.push(skip(SkipReason::MissingProduct));
                continue;
            };
            let vendor = match line.vendor_id.as_deref().or(product.vendor_id.as_deref()) {
                Some(vendor_id) => self.active_vendor(vendor_id).await?,
                None => None,
            };
            let Some(vendor) = vendor else {
                outcome.skipped.push(skip(SkipReason::MissingVendor));
                continue;
            };

            by_vendor
                .entry(vendor.id.clone())
                .or_insert_with(|| (vendor, Vec::new()))
                .1
                .push((product, line.quantity));
        }

        let mut effects = Vec::new();
        if !by_vendor.is_empty() {
            let now = Utc::now();
            let mut tx = self.db.begin().await?;
            for (vendor, items) in by_vendor.values() {
                let first = outcome.created.len();
                for (product, quantity) in items {
                    let order = build_order(product, vendor, *quantity, &actor.identity, None, now);
                    PurchaseOrderRepository::insert(&mut tx, &order).await?;
                    outcome.created.push(order);
                }
                effects.extend(notifications(notify::orders_batched(&outcome.created[first..])));
            }
            tx.commit().await?;
        }

        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            vendors = by_vendor.len(),
            "Batch order creation finished"
        );

        Ok(Committed::with_effects(outcome, effects))
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// PENDING → APPROVED (staff). Records the approver.
    pub async fn approve(&self, order_id: &str, actor: &Actor) -> EngineResult<Committed<PurchaseOrder>> {
        let order = self
            .transition(order_id, OrderEvent::Approve, actor, |_, update| {
                update.approved_by(actor.identity.clone())
            })
            .await?;
        let effects = notifications(notify::order_approved(&order));
        Ok(Committed::with_effects(order, effects))
    }

    /// PENDING/APPROVED/ACCEPTED → REJECTED (staff or the assigned vendor).
    /// Appends the reason to the notes.
    pub async fn reject(
        &self,
        order_id: &str,
        reason: &str,
        actor: &Actor,
    ) -> EngineResult<Committed<PurchaseOrder>> {
        validate_reason(reason)?;

        let order = self
            .transition(order_id, OrderEvent::Reject, actor, |current, update| {
                update.notes(current.appended_notes(&rejection_note(reason)))
            })
            .await?;
        let effects = notifications(notify::order_rejected(&order, &actor.identity, reason.trim()));
        Ok(Committed::with_effects(order, effects))
    }

    /// PENDING/APPROVED → ACCEPTED (assigned vendor). Under the strict
    /// policy only APPROVED orders can be accepted.
    pub async fn accept(
        &self,
        order_id: &str,
        delivery_date: Option<NaiveDate>,
        actor: &Actor,
    ) -> EngineResult<Committed<PurchaseOrder>> {
        let order = self
            .transition(order_id, OrderEvent::Accept, actor, |_, update| {
                update.delivery_date(delivery_date)
            })
            .await?;
        let effects = notifications(notify::order_accepted(&order));
        Ok(Committed::with_effects(order, effects))
    }

    /// ACCEPTED → DISPATCHED (assigned vendor). Records the tracking reference.
    pub async fn dispatch(
        &self,
        order_id: &str,
        tracking: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<Committed<PurchaseOrder>> {
        let tracking = tracking
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let order = self
            .transition(order_id, OrderEvent::Dispatch, actor, |_, update| {
                update.dispatch_tracking(tracking)
            })
            .await?;
        let effects = notifications(notify::order_dispatched(&order));
        Ok(Committed::with_effects(order, effects))
    }

    /// DISPATCHED → COMPLETED (staff).
    ///
    /// The status change and the IN movement for the ordered quantity commit
    /// together; a second completion fails with `InvalidTransition`.
    pub async fn complete(&self, order_id: &str, actor: &Actor) -> EngineResult<Committed<OrderCompletion>> {
        let _order_guard = self.locks.lock(order_id).await;

        let order = self.get(order_id).await?;
        let to = check_transition(&order, OrderEvent::Complete, actor, self.policy)?;

        let _product_guard = self.ledger.lock_product(&order.product_id).await;

        let now = Utc::now();
        let update = StatusUpdate {
            updated_at: now,
            ..StatusUpdate::to(to)
        };

        let mut tx = self.db.begin().await?;
        let Some(completed) =
            PurchaseOrderRepository::compare_and_set(&mut tx, order_id, order.status, &update).await?
        else {
            tx.rollback().await?;
            return Err(self.lost_race(order_id, OrderEvent::Complete.as_str()).await);
        };
        let stock = Ledger::apply_movement(
            &mut tx,
            &order.product_id,
            MovementDirection::In,
            order.quantity,
            Some(&completion_note(&order.order_number)),
            &actor.identity,
            now,
        )
        .await?;
        tx.commit().await?;

        info!(
            order_number = %completed.order_number,
            product_id = %completed.product_id,
            received = completed.quantity,
            new_quantity = stock.product.quantity,
            "Purchase order completed"
        );

        let mut effects = Ledger::effects_for(stock.clone()).effects;
        effects.extend(notifications(notify::order_completed(&completed)));

        Ok(Committed::with_effects(
            OrderCompletion {
                order: completed,
                stock,
            },
            effects,
        ))
    }

    /// Deletes a PENDING or REJECTED order (admin only).
    pub async fn delete(&self, order_id: &str, actor: &Actor) -> EngineResult<PurchaseOrder> {
        let _guard = self.locks.lock(order_id).await;

        let order = self.get(order_id).await?;
        check_delete(&order, actor)?;

        if !self.db.orders().delete_if_deletable(order_id).await? {
            return Err(self.lost_race(order_id, "delete").await);
        }

        info!(order_number = %order.order_number, actor = %actor.identity, "Purchase order deleted");
        Ok(order)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn get(&self, order_id: &str) -> EngineResult<PurchaseOrder> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id).into())
    }

    /// Looks an order up by ID or by order number.
    pub async fn find(&self, id_or_number: &str) -> EngineResult<PurchaseOrder> {
        if let Some(order) = self.db.orders().get_by_number(id_or_number).await? {
            return Ok(order);
        }
        self.get(id_or_number).await
    }

    pub async fn list(&self, status: Option<OrderStatus>) -> EngineResult<Vec<PurchaseOrder>> {
        Ok(self.db.orders().list(status).await?)
    }

    pub async fn list_for_vendor(&self, vendor_id: &str) -> EngineResult<Vec<PurchaseOrder>> {
        Ok(self.db.orders().list_for_vendor(vendor_id).await?)
    }

    /// Orders an actor may see: everything for staff, their own for vendors.
    pub async fn list_visible(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> EngineResult<Vec<PurchaseOrder>> {
        match actor.role {
            Role::Admin | Role::Manager => self.list(status).await,
            Role::Vendor => {
                let mut orders = self.db.orders().list_for_contact(&actor.identity).await?;
                if let Some(status) = status {
                    orders.retain(|o| o.status == status);
                }
                Ok(orders)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn transition(
        &self,
        order_id: &str,
        event: OrderEvent,
        actor: &Actor,
        update: impl FnOnce(&PurchaseOrder, StatusUpdate) -> StatusUpdate,
    ) -> EngineResult<PurchaseOrder> {
        let _guard = self.locks.lock(order_id).await;

        let order = self.get(order_id).await?;
        let to = check_transition(&order, event, actor, self.policy)?;
        let update = update(&order, StatusUpdate::to(to));

        let mut tx = self.db.begin().await?;
        match PurchaseOrderRepository::compare_and_set(&mut tx, order_id, order.status, &update).await? {
            Some(updated) => {
                tx.commit().await?;
                info!(
                    order_number = %updated.order_number,
                    from = %order.status,
                    to = %updated.status,
                    actor = %actor.identity,
                    "Purchase order transitioned"
                );
                Ok(updated)
            }
            None => {
                tx.rollback().await?;
                Err(self.lost_race(order_id, event.as_str()).await)
            }
        }
    }

    /// Error for a compare-and-set that matched nothing.
    async fn lost_race(&self, order_id: &str, event: &str) -> EngineError {
        debug!(order_id = %order_id, event = %event, "Order changed since it was read");
        match self.db.orders().get_by_id(order_id).await {
            Ok(Some(current)) => CoreError::InvalidTransition {
                order_id: order_id.to_string(),
                current: current.status,
                event: event.to_string(),
            }
            .into(),
            Ok(None) => CoreError::not_found("Order", order_id).into(),
            Err(e) => e.into(),
        }
    }

    async fn product(&self, product_id: &str) -> EngineResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id).into())
    }

    /// The vendor, if it exists and is active.
    async fn active_vendor(&self, vendor_id: &str) -> EngineResult<Option<Vendor>> {
        Ok(self
            .db
            .vendors()
            .get_by_id(vendor_id)
            .await?
            .filter(|v| v.is_active))
    }

    async fn insert(&self, order: &PurchaseOrder) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;
        PurchaseOrderRepository::insert(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Snapshots product and vendor into a new PENDING order.
fn build_order(
    product: &Product,
    vendor: &Vendor,
    quantity: i64,
    created_by: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> PurchaseOrder {
    let id = Uuid::new_v4();
    PurchaseOrder {
        id: id.to_string(),
        order_number: format_order_number(now.date_naive(), id),
        vendor_id: vendor.id.clone(),
        vendor_contact: vendor.email.clone(),
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        quantity,
        status: OrderStatus::Pending,
        created_by: created_by.to_string(),
        approved_by: None,
        delivery_date: None,
        dispatch_tracking: None,
        notes,
        created_at: now,
        updated_at: now,
    }
}

fn notifications(list: Vec<Notification>) -> Vec<PostCommit> {
    list.into_iter().map(PostCommit::Notify).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
