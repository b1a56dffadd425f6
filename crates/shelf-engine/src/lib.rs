//! # shelf-engine: Replenishment Engine for Shelf
//!
//! Ties the pure rules in `shelf-core` to the repositories in `shelf-db`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Engine (facade)                                │
//! │                                                                         │
//! │  record_in / record_out          create / approve / ... / complete      │
//! │          │                                    │                         │
//! │          ▼                                    ▼                         │
//! │  ┌────────────────┐  complete   ┌────────────────────┐                  │
//! │  │     Ledger     │◄────────────│    OrderService    │                  │
//! │  │ product lock   │ IN movement │ order lock + CAS   │                  │
//! │  └───────┬────────┘             └─────────┬──────────┘                  │
//! │          │ Committed { value, effects }   │                             │
//! │          └──────────────┬─────────────────┘                             │
//! │                         ▼                                               │
//! │               ┌────────────────────┐   LowStock   ┌──────────────────┐  │
//! │               │   HookDispatcher   │─────────────►│ auto_generate PO │  │
//! │               └─────────┬──────────┘              └──────────────────┘  │
//! │                         │ Notify                                        │
//! │                         ▼                                               │
//! │               notification_outbox ──► OutboxDispatcher ──► sink         │
//! │                                                                         │
//! │  RestockService: history ──► analytics ──► recommendation (read-only)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Engine configuration (TOML + environment)
//! - [`error`] - Engine error types
//! - [`ledger`] - Stock ledger with per-product serialization
//! - [`orders`] - Purchase-order lifecycle with per-order serialization
//! - [`hooks`] - Post-commit effects and their dispatcher
//! - [`notify`] - Notification builders and the outbox writer
//! - [`outbox`] - Background delivery of queued notifications
//! - [`restock`] - Restock suggestions over ledger history
//! - [`locks`] - Keyed async locks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_core::Actor;
//! use shelf_engine::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::load(None)?).await?;
//! let outcome = engine.record_out(&product_id, 5, None, &Actor::manager("alice")).await?;
//! if let Some(signal) = outcome.low_stock {
//!     println!("{} left, {} orders raised", signal.new_quantity, outcome.auto_orders.len());
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod locks;
pub mod notify;
pub mod orders;
pub mod outbox;
pub mod restock;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use hooks::{Committed, HookDispatcher, HookReport, PostCommit};
pub use ledger::{Ledger, StockChange};
pub use notify::Notifier;
pub use orders::{BatchLine, BatchOutcome, NewOrder, OrderCompletion, OrderService, SkipReason, SkippedLine};
pub use outbox::{DispatchReport, LogSink, NotificationSink, OutboxDispatcher, OutboxDispatcherHandle};
pub use restock::RestockService;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shelf_core::validation::{validate_email, validate_name, validate_reorder_settings, validate_sku};
use shelf_core::{
    Actor, CoreError, LowStockSignal, Product, PurchaseOrder, RestockPrediction, StockMovement, Vendor,
};
use shelf_db::{Database, NewProduct};
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a stock movement after its post-commit effects ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOutcome {
    pub movement: StockMovement,
    /// Product state right after the movement.
    pub product: Product,
    pub low_stock: Option<LowStockSignal>,
    /// Orders generated because of `low_stock`.
    pub auto_orders: Vec<PurchaseOrder>,
}

// =============================================================================
// Engine
// =============================================================================

/// Facade over the ledger, order, restock and notification services.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: Arc<EngineConfig>,
    ledger: Ledger,
    orders: OrderService,
    restock: RestockService,
    hooks: HookDispatcher,
}

impl Engine {
    /// Opens the configured database (running migrations) and builds the engine.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, config))
    }

    /// Builds the engine over an already opened database.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let ledger = Ledger::new(db.clone());
        let orders = OrderService::new(db.clone(), ledger.clone(), config.accept_policy());
        let restock = RestockService::new(db.clone(), config.restock.window_days);
        let hooks = HookDispatcher::new(orders.clone(), Notifier::new(&db), config.orders.auto_generate);

        Engine {
            db,
            config: Arc::new(config),
            ledger,
            orders,
            restock,
            hooks,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn restock(&self) -> &RestockService {
        &self.restock
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Registers a vendor (staff only).
    pub async fn add_vendor(&self, name: &str, email: &str, actor: &Actor) -> EngineResult<Vendor> {
        require_staff(actor, "register vendors")?;
        validate_name("name", name)?;
        validate_email(email)?;

        let vendor = self.db.vendors().insert(name.trim(), email.trim()).await?;
        info!(vendor_id = %vendor.id, email = %vendor.email, "Vendor registered");
        Ok(vendor)
    }

    /// Registers a product at zero stock (staff only).
    pub async fn add_product(&self, new: NewProduct, actor: &Actor) -> EngineResult<Product> {
        require_staff(actor, "register products")?;
        validate_sku(&new.sku)?;
        validate_name("name", &new.name)?;
        validate_reorder_settings(new.reorder_level, new.reorder_quantity)?;
        if let Some(vendor_id) = new.vendor_id.as_deref() {
            self.vendor(vendor_id).await?;
        }

        let product = self.db.products().insert(new).await?;
        info!(product_id = %product.id, sku = %product.sku, "Product registered");
        Ok(product)
    }

    /// Sets or clears a product's vendor (staff only).
    pub async fn assign_vendor(
        &self,
        product_id: &str,
        vendor_id: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<Product> {
        require_staff(actor, "assign vendors")?;
        if self.db.products().get_by_id(product_id).await?.is_none() {
            return Err(CoreError::not_found("Product", product_id).into());
        }
        if let Some(vendor_id) = vendor_id {
            self.vendor(vendor_id).await?;
        }

        Ok(self.db.products().assign_vendor(product_id, vendor_id).await?)
    }

    /// Changes a product's reorder level and quantity (staff only).
    pub async fn set_reorder(
        &self,
        product_id: &str,
        reorder_level: i64,
        reorder_quantity: i64,
        actor: &Actor,
    ) -> EngineResult<Product> {
        require_staff(actor, "change reorder settings")?;
        validate_reorder_settings(reorder_level, reorder_quantity)?;

        let product = self
            .db
            .products()
            .update_reorder_settings(product_id, reorder_level, reorder_quantity)
            .await?;
        info!(
            product_id = %product.id,
            reorder_level,
            reorder_quantity,
            "Reorder settings changed"
        );
        Ok(product)
    }

    /// Looks a vendor up by ID or contact email.
    pub async fn find_vendor(&self, id_or_email: &str) -> EngineResult<Vendor> {
        if let Some(vendor) = self.db.vendors().get_by_email(id_or_email).await? {
            return Ok(vendor);
        }
        self.vendor(id_or_email).await
    }

    /// Looks a product up by ID or SKU.
    pub async fn product(&self, id_or_sku: &str) -> EngineResult<Product> {
        let products = self.db.products();
        if let Some(product) = products.get_by_sku(id_or_sku).await? {
            return Ok(product);
        }
        products
            .get_by_id(id_or_sku)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id_or_sku).into())
    }

    pub async fn list_products(&self, low_stock_only: bool) -> EngineResult<Vec<Product>> {
        let products = self.db.products();
        Ok(if low_stock_only {
            products.list_low_stock().await?
        } else {
            products.list().await?
        })
    }

    async fn vendor(&self, vendor_id: &str) -> EngineResult<Vendor> {
        self.db
            .vendors()
            .get_by_id(vendor_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Vendor", vendor_id).into())
    }

    // =========================================================================
    // Stock Ledger
    // =========================================================================

    pub async fn record_in(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<StockOutcome> {
        let committed = self.ledger.record_in(product_id, quantity, notes, actor).await?;
        Ok(self.settle_stock(committed).await)
    }

    /// Records a stock-out. A resulting low-stock signal raises an order
    /// after commit; failures there never undo the movement.
    pub async fn record_out(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<StockOutcome> {
        let committed = self.ledger.record_out(product_id, quantity, notes, actor).await?;
        Ok(self.settle_stock(committed).await)
    }

    pub async fn movements(&self, product_id: &str, limit: u32) -> EngineResult<Vec<StockMovement>> {
        self.ledger.movements(product_id, limit).await
    }

    // =========================================================================
    // Purchase Orders
    // =========================================================================

    pub async fn create_order(&self, request: NewOrder, actor: &Actor) -> EngineResult<PurchaseOrder> {
        let committed = self.orders.create(request, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn create_orders(&self, lines: Vec<BatchLine>, actor: &Actor) -> EngineResult<BatchOutcome> {
        let committed = self.orders.create_batch(lines, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn approve_order(&self, order_id: &str, actor: &Actor) -> EngineResult<PurchaseOrder> {
        let committed = self.orders.approve(order_id, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn reject_order(&self, order_id: &str, reason: &str, actor: &Actor) -> EngineResult<PurchaseOrder> {
        let committed = self.orders.reject(order_id, reason, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn accept_order(
        &self,
        order_id: &str,
        delivery_date: Option<NaiveDate>,
        actor: &Actor,
    ) -> EngineResult<PurchaseOrder> {
        let committed = self.orders.accept(order_id, delivery_date, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn dispatch_order(
        &self,
        order_id: &str,
        tracking: Option<&str>,
        actor: &Actor,
    ) -> EngineResult<PurchaseOrder> {
        let committed = self.orders.dispatch(order_id, tracking, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn complete_order(&self, order_id: &str, actor: &Actor) -> EngineResult<OrderCompletion> {
        let committed = self.orders.complete(order_id, actor).await?;
        Ok(self.settle(committed).await)
    }

    pub async fn delete_order(&self, order_id: &str, actor: &Actor) -> EngineResult<PurchaseOrder> {
        self.orders.delete(order_id, actor).await
    }

    // =========================================================================
    // Restock & Notifications
    // =========================================================================

    pub async fn restock_suggestions(&self) -> EngineResult<Vec<RestockPrediction>> {
        self.restock.suggestions().await
    }

    pub async fn predict(&self, product_id: &str) -> EngineResult<RestockPrediction> {
        self.restock.predict(product_id).await
    }

    /// A dispatcher over this engine's outbox, not yet running.
    pub fn outbox_dispatcher(&self, sink: Arc<dyn NotificationSink>) -> (OutboxDispatcher, OutboxDispatcherHandle) {
        OutboxDispatcher::new(self.db.clone(), sink, self.config.outbox.clone())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn settle<T>(&self, committed: Committed<T>) -> T {
        let (value, effects) = committed.into_parts();
        self.hooks.dispatch(effects).await;
        value
    }

    async fn settle_stock(&self, committed: Committed<StockChange>) -> StockOutcome {
        let (change, effects) = committed.into_parts();
        let report = self.hooks.dispatch(effects).await;
        StockOutcome {
            movement: change.movement,
            product: change.product,
            low_stock: report.low_stock,
            auto_orders: report.auto_orders,
        }
    }
}

fn require_staff(actor: &Actor, action: &str) -> EngineResult<()> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(CoreError::forbidden(format!("only an admin or manager may {}", action)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::{ErrorKind, OrderStatus};
    use shelf_db::DbConfig;

    async fn engine(auto_generate: bool) -> Engine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = EngineConfig::default();
        config.orders.auto_generate = auto_generate;
        Engine::new(db, config)
    }

    #[tokio::test]
    async fn test_catalog_requires_staff_and_valid_input() {
        let engine = engine(true).await;
        let vendor_actor = Actor::vendor("acme@example.com");

        let err = engine.add_vendor("Acme", "acme@example.com", &vendor_actor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = engine.add_vendor("Acme", "not-an-email", &Actor::admin("root")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine
            .add_product(NewProduct::new("SKU-1", "Widget").vendor("ghost"), &Actor::admin("root"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = engine
            .add_product(NewProduct::new("SKU-1", "Widget").reorder(-1, 5), &Actor::admin("root"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_stock_out_raises_order_after_commit() {
        let engine = engine(true).await;
        let admin = Actor::admin("root");
        let vendor = engine.add_vendor("Acme", "acme@example.com", &admin).await.unwrap();
        let product = engine
            .add_product(NewProduct::new("SKU-1", "Widget").reorder(10, 30), &admin)
            .await
            .unwrap();
        engine.assign_vendor(&product.id, Some(&vendor.id), &admin).await.unwrap();

        engine.record_in(&product.id, 15, None, &admin).await.unwrap();
        let outcome = engine.record_out(&product.id, 5, None, &admin).await.unwrap();

        assert_eq!(outcome.product.quantity, 10);
        assert_eq!(outcome.low_stock.as_ref().map(|s| s.new_quantity), Some(10));
        assert_eq!(outcome.auto_orders.len(), 1);
        assert_eq!(outcome.auto_orders[0].quantity, 30);
        assert_eq!(outcome.auto_orders[0].status, OrderStatus::Pending);

        assert_eq!(engine.product("SKU-1").await.unwrap().id, product.id);
        assert_eq!(engine.find_vendor("ACME@example.com").await.unwrap().id, vendor.id);
    }

    #[tokio::test]
    async fn test_set_reorder() {
        let engine = engine(true).await;
        let admin = Actor::admin("root");
        let product = engine.add_product(NewProduct::new("SKU-1", "Widget"), &admin).await.unwrap();

        let updated = engine.set_reorder(&product.id, 4, 50, &admin).await.unwrap();
        assert_eq!((updated.reorder_level, updated.reorder_quantity), (4, 50));

        let err = engine.set_reorder(&product.id, 4, 0, &admin).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = engine.set_reorder(&product.id, 0, 50, &admin).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(engine.product(&product.id).await.unwrap().reorder_level, 4);

        let err = engine
            .set_reorder(&product.id, 4, 50, &Actor::vendor("acme@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = engine.set_reorder("ghost", 4, 50, &admin).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_zero_reorder_level_is_refused() {
        let engine = engine(true).await;
        let admin = Actor::admin("root");

        let err = engine
            .add_product(NewProduct::new("SKU-0", "Widget").reorder(0, 5), &admin)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(engine.db().products().get_by_sku("SKU-0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_generation_can_be_disabled() {
        let engine = engine(false).await;
        let admin = Actor::admin("root");
        let vendor = engine.add_vendor("Acme", "acme@example.com", &admin).await.unwrap();
        let product = engine
            .add_product(NewProduct::new("SKU-1", "Widget").vendor(&vendor.id), &admin)
            .await
            .unwrap();

        engine.record_in(&product.id, 5, None, &admin).await.unwrap();
        let outcome = engine.record_out(&product.id, 5, None, &admin).await.unwrap();

        assert!(outcome.low_stock.is_some());
        assert!(outcome.auto_orders.is_empty());
        assert!(engine.orders().list(None).await.unwrap().is_empty());
    }
}
