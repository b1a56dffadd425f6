//! # Restock Service
//!
//! Feeds ledger history through demand analytics and the recommendation
//! rules, for one product or as a batch report.
//!
//! ```text
//! products at/below reorder level ──► history(window) ──► analyze_window
//!        (fallback: effective level,                          │
//!         default 10 when unset)                              ▼
//!                                                        recommend
//!                                                             │
//!                                                             ▼
//!                                           sort_by_urgency (CRITICAL first)
//! ```
//!
//! Read-only: nothing here takes locks or writes.

use chrono::{DateTime, Utc};
use shelf_core::analytics::{analyze_window, window_start};
use shelf_core::restock::{recommend, sort_by_urgency};
use shelf_core::{CoreError, Product, RestockPrediction, Urgency, DEFAULT_REORDER_LEVEL};
use shelf_db::Database;
use tracing::{debug, info};

use crate::error::EngineResult;

/// Restock recommendation service.
#[derive(Debug, Clone)]
pub struct RestockService {
    db: Database,
    window_days: i64,
}

impl RestockService {
    pub fn new(db: Database, window_days: i64) -> Self {
        RestockService { db, window_days }
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    /// Suggestions for every product that needs restocking, most urgent first.
    pub async fn suggestions(&self) -> EngineResult<Vec<RestockPrediction>> {
        self.suggestions_as_of(Utc::now()).await
    }

    /// Same as [`RestockService::suggestions`] with an explicit clock.
    pub async fn suggestions_as_of(&self, as_of: DateTime<Utc>) -> EngineResult<Vec<RestockPrediction>> {
        let products = self.candidates().await?;

        let mut predictions = Vec::with_capacity(products.len());
        for product in &products {
            predictions.push(self.predict_product(product, as_of).await?);
        }
        sort_by_urgency(&mut predictions);

        info!(
            candidates = products.len(),
            critical = predictions
                .iter()
                .filter(|p| p.urgency == Urgency::Critical)
                .count(),
            "Restock suggestions computed"
        );

        Ok(predictions)
    }

    /// Prediction for a single product, regardless of its stock level.
    pub async fn predict(&self, product_id: &str) -> EngineResult<RestockPrediction> {
        self.predict_as_of(product_id, Utc::now()).await
    }

    pub async fn predict_as_of(&self, product_id: &str, as_of: DateTime<Utc>) -> EngineResult<RestockPrediction> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", product_id))?;

        self.predict_product(&product, as_of).await
    }

    /// Products at or below their stored reorder level; when there are none,
    /// products at or below their effective level.
    async fn candidates(&self) -> EngineResult<Vec<Product>> {
        let products = self.db.products();

        let low = products.list_low_stock().await?;
        if !low.is_empty() {
            return Ok(low);
        }

        debug!(default_level = DEFAULT_REORDER_LEVEL, "No low-stock products, using effective levels");
        Ok(products.list_at_or_below_effective(DEFAULT_REORDER_LEVEL).await?)
    }

    async fn predict_product(&self, product: &Product, as_of: DateTime<Utc>) -> EngineResult<RestockPrediction> {
        let since = window_start(as_of, self.window_days);
        let history = self.db.movements().history(&product.id, Some(since)).await?;

        let analytics = analyze_window(&history, as_of, self.window_days);
        Ok(recommend(product, &analytics))
    }
}
