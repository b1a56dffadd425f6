//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Low-stock listings
//! - The conditional stock update used by the ledger
//!
//! ## Conditional Stock Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, check, write                                          │
//! │     SELECT quantity ...        (two writers both see 10)               │
//! │     UPDATE products SET quantity = 3                                   │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional delta                                     │
//! │     UPDATE products SET quantity = quantity + ?delta                   │
//! │     WHERE id = ? AND quantity + ?delta >= 0                            │
//! │     RETURNING *                                                        │
//! │                                                                         │
//! │  No row back → either the product is missing or the stock is short.   │
//! │  A second lookup on the same connection tells which.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use shelf_core::{Product, DEFAULT_REORDER_LEVEL, DEFAULT_REORDER_QUANTITY};

/// Fields supplied when registering a product.
///
/// Products always start at zero stock; opening stock is recorded as an IN
/// movement so the ledger stays the source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub reorder_level: i64,
    pub reorder_quantity: i64,
    pub vendor_id: Option<String>,
    pub unit_price_cents: i64,
}

impl NewProduct {
    /// A product with default reorder settings and no vendor.
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        NewProduct {
            sku: sku.into(),
            name: name.into(),
            reorder_level: DEFAULT_REORDER_LEVEL,
            reorder_quantity: DEFAULT_REORDER_QUANTITY,
            vendor_id: None,
            unit_price_cents: 0,
        }
    }

    pub fn reorder(mut self, level: i64, quantity: i64) -> Self {
        self.reorder_level = level;
        self.reorder_quantity = quantity;
        self
    }

    pub fn vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }

    pub fn price_cents(mut self, cents: i64) -> Self {
        self.unit_price_cents = cents;
        self
    }
}

/// Outcome of [`ProductRepository::try_adjust_quantity`].
#[derive(Debug, Clone, PartialEq)]
pub enum StockUpdate {
    /// The delta was applied; carries the updated row.
    Applied(Product),
    /// No product with that ID.
    Missing,
    /// Applying the delta would take stock below zero.
    Insufficient { available: i64 },
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let product = repo.insert(NewProduct::new("MILK-1L", "Milk 1L")).await?;
/// let low = repo.list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product with zero stock.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::ForeignKeyViolation)` - vendor_id does not exist
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        debug!(sku = %new.sku, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            sku: new.sku,
            name: new.name,
            quantity: 0,
            reorder_level: new.reorder_level,
            reorder_quantity: new.reorder_quantity,
            vendor_id: new.vendor_id,
            unit_price_cents: new.unit_price_cents,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, quantity, reorder_level, reorder_quantity,
                vendor_id, unit_price_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.reorder_level)
        .bind(product.reorder_quantity)
        .bind(&product.vendor_id)
        .bind(product.unit_price_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists all products ordered by SKU.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY sku")
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists products at or below their stored reorder level.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE quantity <= reorder_level ORDER BY sku",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low-stock products");
        Ok(products)
    }

    /// Lists products at or below their effective reorder level, treating a
    /// stored level of zero or below as `default_level`.
    pub async fn list_at_or_below_effective(&self, default_level: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE quantity <= CASE WHEN reorder_level > 0 THEN reorder_level ELSE ?1 END
            ORDER BY sku
            "#,
        )
        .bind(default_level)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists the products supplied by a vendor.
    pub async fn list_for_vendor(&self, vendor_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE vendor_id = ?1 ORDER BY sku",
        )
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Sets (or clears) the vendor supplying a product.
    pub async fn assign_vendor(&self, id: &str, vendor_id: Option<&str>) -> DbResult<Product> {
        debug!(id = %id, vendor_id = ?vendor_id, "Assigning vendor");

        sqlx::query_as::<_, Product>(
            "UPDATE products SET vendor_id = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(id)
        .bind(vendor_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Updates the reorder level and reorder quantity.
    pub async fn update_reorder_settings(
        &self,
        id: &str,
        reorder_level: i64,
        reorder_quantity: i64,
    ) -> DbResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET reorder_level = ?2, reorder_quantity = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(reorder_level)
        .bind(reorder_quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Transactional helpers
    // -------------------------------------------------------------------------

    /// Applies `delta` to a product's stock unless it would go negative.
    ///
    /// Must be the first statement of its transaction (see `pool` docs).
    pub async fn try_adjust_quantity(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<StockUpdate> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET quantity = quantity + ?2, updated_at = ?3
            WHERE id = ?1 AND quantity + ?2 >= 0
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(product) = updated {
            return Ok(StockUpdate::Applied(product));
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match available {
            Some(available) => StockUpdate::Insufficient { available },
            None => StockUpdate::Missing,
        })
    }

    /// Reads a product inside an open transaction.
    pub async fn fetch_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
