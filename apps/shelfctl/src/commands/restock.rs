//! `shelfctl restock ...`

use clap::Subcommand;
use serde_json::Value;

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum RestockCommand {
    /// Restock suggestions, most urgent first
    Suggest {
        /// Predict a single product (SKU or ID) regardless of its stock level
        #[arg(long)]
        product: Option<String>,
    },
}

pub async fn run(cmd: RestockCommand, ctx: &Context) -> Result<Value, ApiError> {
    match cmd {
        RestockCommand::Suggest { product: Some(product) } => {
            let product_id = ctx.product_id(&product).await?;
            to_json(&ctx.engine.predict(&product_id).await?)
        }
        RestockCommand::Suggest { product: None } => to_json(&ctx.engine.restock_suggestions().await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use shelf_db::NewProduct;

    #[tokio::test]
    async fn test_suggest_lists_only_low_products() {
        let ctx = context().await;
        let engine = &ctx.engine;
        let low = engine
            .add_product(NewProduct::new("FLOUR", "Flour"), &ctx.actor)
            .await
            .unwrap();
        let stocked = engine
            .add_product(NewProduct::new("TEA", "Tea"), &ctx.actor)
            .await
            .unwrap();
        engine.record_in(&stocked.id, 100, None, &ctx.actor).await.unwrap();

        let all = run(RestockCommand::Suggest { product: None }, &ctx).await.unwrap();
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["product_id"], low.id);
        assert_eq!(all[0]["urgency"], "CRITICAL");

        let single = run(RestockCommand::Suggest { product: Some("TEA".into()) }, &ctx)
            .await
            .unwrap();
        assert_eq!(single["current_stock"], 100);
    }
}
