//! # Stock Movement Repository
//!
//! The append-only stock ledger. Rows are only ever inserted; triggers in the
//! schema reject UPDATE and DELETE.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use shelf_core::StockMovement;

/// Repository for stock movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement inside an open transaction.
    ///
    /// Called right after the product's quantity was adjusted on the same
    /// connection, so both commit or neither does.
    pub async fn insert(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            direction = %movement.direction,
            quantity = movement.quantity,
            "Appending stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, direction, quantity, notes, actor, occurred_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.direction)
        .bind(movement.quantity)
        .bind(&movement.notes)
        .bind(&movement.actor)
        .bind(movement.occurred_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Movement history for a product, oldest first.
    ///
    /// With `since`, only movements at or after that instant are returned.
    pub async fn history(
        &self,
        product_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = ?1
            AND (?2 IS NULL OR occurred_at >= ?2)
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(product_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// The most recent movements for a product, newest first.
    pub async fn recent(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE product_id = ?1
            ORDER BY occurred_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Sum of signed movement quantities (+IN, -OUT) for a product.
    ///
    /// Always equals the product's stored quantity.
    pub async fn net_quantity(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN direction = 'IN' THEN quantity ELSE -quantity END), 0)
            FROM stock_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Counts movements for a product.
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1")
                .bind(product_id)
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
    use chrono::Duration;
    use shelf_core::MovementDirection;

    fn movement(product_id: &str, direction: MovementDirection, quantity: i64, at: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id: generate_id(),
            product_id: product_id.to_string(),
            direction,
            quantity,
            notes: None,
            actor: "tester".to_string(),
            occurred_at: at,
        }
    }

    #[tokio::test]
    async fn test_history_order_and_since_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(NewProduct::new("SKU-1", "One")).await.unwrap();
        let start = Utc::now() - Duration::days(10);

        let mut tx = db.begin().await.unwrap();
        // Inserted out of order on purpose
        for (days, direction, qty) in [
            (5, MovementDirection::Out, 2),
            (0, MovementDirection::In, 20),
            (8, MovementDirection::Out, 3),
        ] {
            MovementRepository::insert(&mut tx, &movement(&product.id, direction, qty, start + Duration::days(days)))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let repo = db.movements();
        let all = repo.history(&product.id, None).await.unwrap();
        let quantities: Vec<i64> = all.iter().map(|m| m.quantity).collect();
        assert_eq!(quantities, vec![20, 2, 3]);

        let since = repo
            .history(&product.id, Some(start + Duration::days(5)))
            .await
            .unwrap();
        assert_eq!(since.len(), 2);

        let recent = repo.recent(&product.id, 1).await.unwrap();
        assert_eq!(recent[0].quantity, 3);

        assert_eq!(repo.net_quantity(&product.id).await.unwrap(), 15);
        assert_eq!(repo.count_for_product(&product.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_movements_are_immutable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(NewProduct::new("SKU-1", "One")).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        MovementRepository::insert(&mut conn, &movement(&product.id, MovementDirection::In, 5, Utc::now()))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE stock_movements SET quantity = 50")
            .execute(&mut *conn)
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM stock_movements").execute(&mut *conn).await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_empty_history_nets_to_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.movements().net_quantity("ghost").await.unwrap(), 0);
        assert!(db.movements().history("ghost", None).await.unwrap().is_empty());
    }
}
