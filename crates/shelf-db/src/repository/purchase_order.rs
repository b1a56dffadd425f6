//! # Purchase Order Repository
//!
//! Database operations for purchase orders.
//!
//! ## Compare-And-Set Status Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Status Transition                                    │
//! │                                                                         │
//! │  UPDATE purchase_orders                                                │
//! │  SET status = 'ACCEPTED', delivery_date = ?, updated_at = ?            │
//! │  WHERE id = ? AND status = 'APPROVED'      ← expected current status   │
//! │  RETURNING *                                                           │
//! │                                                                         │
//! │  Row back   → transition applied                                       │
//! │  No row     → someone else moved the order first (or it is gone);      │
//! │               the caller re-reads to report the current status         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shelf_core::{OrderStatus, PurchaseOrder};

/// Column changes applied together with a status transition.
///
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub approved_by: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub dispatch_tracking: Option<String>,
    /// Replaces the notes column when set.
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    /// A bare status change.
    pub fn to(status: OrderStatus) -> Self {
        StatusUpdate {
            status,
            approved_by: None,
            delivery_date: None,
            dispatch_tracking: None,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    pub fn approved_by(mut self, identity: impl Into<String>) -> Self {
        self.approved_by = Some(identity.into());
        self
    }

    pub fn delivery_date(mut self, date: Option<NaiveDate>) -> Self {
        self.delivery_date = date;
        self
    }

    pub fn dispatch_tracking(mut self, tracking: Option<String>) -> Self {
        self.dispatch_tracking = tracking;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Repository for purchase order operations.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Inserts an order inside an open transaction.
    pub async fn insert(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
        debug!(
            order_number = %order.order_number,
            vendor_id = %order.vendor_id,
            quantity = order.quantity,
            "Inserting purchase order"
        );

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, order_number, vendor_id, vendor_contact, product_id, product_name,
                quantity, status, created_by, approved_by, delivery_date,
                dispatch_tracking, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.vendor_id)
        .bind(&order.vendor_contact)
        .bind(&order.product_id)
        .bind(&order.product_name)
        .bind(order.quantity)
        .bind(order.status)
        .bind(&order.created_by)
        .bind(&order.approved_by)
        .bind(order.delivery_date)
        .bind(&order.dispatch_tracking)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order by its human-readable number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT * FROM purchase_orders WHERE order_number = ?1",
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Reads an order inside an open transaction.
    pub async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let order = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    /// Lists orders, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<OrderStatus>) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists orders placed with a vendor, newest first.
    pub async fn list_for_vendor(&self, vendor_id: &str) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE vendor_id = ?1
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists orders whose vendor contact matches an identity (case-insensitive).
    pub async fn list_for_contact(&self, contact: &str) -> DbResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE vendor_contact = ?1 COLLATE NOCASE
            ORDER BY created_at DESC, order_number DESC
            "#,
        )
        .bind(contact)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Applies `update` only if the order is still in `expected` status.
    ///
    /// ## Returns
    /// * `Ok(Some(order))` - Transition applied; the updated row
    /// * `Ok(None)` - Status no longer matches (or the order is gone)
    pub async fn compare_and_set(
        conn: &mut SqliteConnection,
        id: &str,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> DbResult<Option<PurchaseOrder>> {
        debug!(
            id = %id,
            from = %expected,
            to = %update.status,
            "Compare-and-set order status"
        );

        let order = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            UPDATE purchase_orders SET
                status = ?3,
                approved_by = COALESCE(?4, approved_by),
                delivery_date = COALESCE(?5, delivery_date),
                dispatch_tracking = COALESCE(?6, dispatch_tracking),
                notes = COALESCE(?7, notes),
                updated_at = ?8
            WHERE id = ?1 AND status = ?2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(update.status)
        .bind(&update.approved_by)
        .bind(update.delivery_date)
        .bind(&update.dispatch_tracking)
        .bind(&update.notes)
        .bind(update.updated_at)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(order)
    }

    /// Deletes an order if it is PENDING or REJECTED.
    ///
    /// Returns false when nothing was deleted.
    pub async fn delete_if_deletable(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting purchase order");

        let result = sqlx::query(
            "DELETE FROM purchase_orders WHERE id = ?1 AND status IN ('PENDING', 'REJECTED')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts orders for a product in the given status.
    pub async fn count_for_product(&self, product_id: &str, status: OrderStatus) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_orders WHERE product_id = ?1 AND status = ?2",
        )
        .bind(product_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use crate::repository::product::NewProduct;

    async fn setup() -> (Database, PurchaseOrder) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let vendor = db.vendors().insert("Acme", "acme@example.com").await.unwrap();
        let product = db
            .products()
            .insert(NewProduct::new("SKU-1", "Widget").vendor(&vendor.id))
            .await
            .unwrap();

        let now = Utc::now();
        let order = PurchaseOrder {
            id: generate_id(),
            order_number: "PO-20240301-0000000A".into(),
            vendor_id: vendor.id.clone(),
            vendor_contact: vendor.email.clone(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: 20,
            status: OrderStatus::Pending,
            created_by: "alice".into(),
            approved_by: None,
            delivery_date: None,
            dispatch_tracking: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        let mut conn = db.pool().acquire().await.unwrap();
        PurchaseOrderRepository::insert(&mut conn, &order).await.unwrap();
        drop(conn);

        (db, order)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, order) = setup().await;
        let repo = db.orders();

        let stored = repo.get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.order_number, order.order_number);
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(repo.get_by_number(&order.order_number).await.unwrap().unwrap().id, order.id);
        assert_eq!(repo.list(Some(OrderStatus::Pending)).await.unwrap().len(), 1);
        assert!(repo.list(Some(OrderStatus::Approved)).await.unwrap().is_empty());
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_contact("ACME@example.com").await.unwrap().len(), 1);
        assert_eq!(repo.list_for_vendor(&order.vendor_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_set_only_from_expected_status() {
        let (db, order) = setup().await;
        let mut tx = db.begin().await.unwrap();

        let update = StatusUpdate::to(OrderStatus::Approved).approved_by("alice");
        let applied = PurchaseOrderRepository::compare_and_set(&mut tx, &order.id, OrderStatus::Pending, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.status, OrderStatus::Approved);
        assert_eq!(applied.approved_by.as_deref(), Some("alice"));

        // Second attempt from PENDING loses the race
        let again = PurchaseOrderRepository::compare_and_set(&mut tx, &order.id, OrderStatus::Pending, &update)
            .await
            .unwrap();
        assert!(again.is_none());

        let date = NaiveDate::from_ymd_opt(2024, 4, 1);
        let accepted = PurchaseOrderRepository::compare_and_set(
            &mut tx,
            &order.id,
            OrderStatus::Approved,
            &StatusUpdate::to(OrderStatus::Accepted).delivery_date(date),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(accepted.delivery_date, date);
        // Untouched by the second update
        assert_eq!(accepted.approved_by.as_deref(), Some("alice"));
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_only_pending_or_rejected() {
        let (db, order) = setup().await;

        let mut tx = db.begin().await.unwrap();
        PurchaseOrderRepository::compare_and_set(
            &mut tx,
            &order.id,
            OrderStatus::Pending,
            &StatusUpdate::to(OrderStatus::Approved),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(!db.orders().delete_if_deletable(&order.id).await.unwrap());

        let mut tx = db.begin().await.unwrap();
        PurchaseOrderRepository::compare_and_set(
            &mut tx,
            &order.id,
            OrderStatus::Approved,
            &StatusUpdate::to(OrderStatus::Rejected).notes("Rejection reason: late"),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(db.orders().delete_if_deletable(&order.id).await.unwrap());
        assert!(db.orders().get_by_id(&order.id).await.unwrap().is_none());
    }
}
