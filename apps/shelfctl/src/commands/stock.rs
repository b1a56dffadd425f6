//! `shelfctl stock ...`

use clap::Subcommand;
use serde_json::Value;

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum StockCommand {
    /// Record received stock
    In {
        /// SKU or product ID
        product: String,
        quantity: i64,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Record sold or removed stock
    Out {
        /// SKU or product ID
        product: String,
        quantity: i64,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Most recent movements for a product
    History {
        /// SKU or product ID
        product: String,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

pub async fn run(cmd: StockCommand, ctx: &Context) -> Result<Value, ApiError> {
    match cmd {
        StockCommand::In {
            product,
            quantity,
            notes,
        } => {
            let product_id = ctx.product_id(&product).await?;
            let outcome = ctx
                .engine
                .record_in(&product_id, quantity, notes.as_deref(), &ctx.actor)
                .await?;
            to_json(&outcome)
        }

        StockCommand::Out {
            product,
            quantity,
            notes,
        } => {
            let product_id = ctx.product_id(&product).await?;
            let outcome = ctx
                .engine
                .record_out(&product_id, quantity, notes.as_deref(), &ctx.actor)
                .await?;
            to_json(&outcome)
        }

        StockCommand::History { product, limit } => {
            let product_id = ctx.product_id(&product).await?;
            to_json(&ctx.engine.movements(&product_id, limit).await?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use crate::error::ErrorCode;
    use shelf_db::NewProduct;

    #[tokio::test]
    async fn test_in_out_history_by_sku() {
        let ctx = context().await;
        ctx.engine
            .add_product(NewProduct::new("EGGS", "Eggs").reorder(2, 12), &ctx.actor)
            .await
            .unwrap();

        let received = run(
            StockCommand::In {
                product: "EGGS".into(),
                quantity: 12,
                notes: Some("delivery".into()),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(received["product"]["quantity"], 12);

        let sold = run(
            StockCommand::Out {
                product: "EGGS".into(),
                quantity: 5,
                notes: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(sold["product"]["quantity"], 7);
        assert!(sold["low_stock"].is_null());

        let history = run(
            StockCommand::History {
                product: "EGGS".into(),
                limit: 10,
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(history.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_oversized_out_is_conflict() {
        let ctx = context().await;
        ctx.engine
            .add_product(NewProduct::new("SALT", "Salt"), &ctx.actor)
            .await
            .unwrap();

        let err = run(
            StockCommand::Out {
                product: "SALT".into(),
                quantity: 1,
                notes: None,
            },
            &ctx,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.exit_code(), 5);
    }
}
