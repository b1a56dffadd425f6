//! `shelfctl product ...`

use clap::Subcommand;
use serde_json::{json, Value};
use shelf_core::{DEFAULT_REORDER_LEVEL, DEFAULT_REORDER_QUANTITY};
use shelf_db::NewProduct;

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// Register a product at zero stock
    Add {
        sku: String,
        name: String,

        /// Stock level at or below which the product is low
        #[arg(long, default_value_t = DEFAULT_REORDER_LEVEL)]
        reorder_level: i64,

        /// Quantity ordered when stock runs low
        #[arg(long, default_value_t = DEFAULT_REORDER_QUANTITY)]
        reorder_quantity: i64,

        /// Vendor (email or ID) that supplies this product
        #[arg(long)]
        vendor: Option<String>,

        #[arg(long, default_value_t = 0)]
        price_cents: i64,
    },

    /// List products
    List {
        /// Only products at or below their reorder level
        #[arg(long)]
        low: bool,
    },

    /// Show one product with its current prediction
    Show {
        /// SKU or product ID
        product: String,
    },

    /// Set or clear a product's vendor
    AssignVendor {
        /// SKU or product ID
        product: String,
        /// Vendor email or ID; omit to clear
        vendor: Option<String>,
    },

    /// Change reorder level and quantity
    Reorder {
        /// SKU or product ID
        product: String,
        level: i64,
        quantity: i64,
    },
}

pub async fn run(cmd: ProductCommand, ctx: &Context) -> Result<Value, ApiError> {
    match cmd {
        ProductCommand::Add {
            sku,
            name,
            reorder_level,
            reorder_quantity,
            vendor,
            price_cents,
        } => {
            let mut new = NewProduct::new(sku, name)
                .reorder(reorder_level, reorder_quantity)
                .price_cents(price_cents);
            if let Some(vendor) = vendor {
                new = new.vendor(ctx.vendor_id(&vendor).await?);
            }
            to_json(&ctx.engine.add_product(new, &ctx.actor).await?)
        }

        ProductCommand::List { low } => to_json(&ctx.engine.list_products(low).await?),

        ProductCommand::Show { product } => {
            let product = ctx.engine.product(&product).await?;
            let prediction = ctx.engine.predict(&product.id).await?;
            Ok(json!({
                "product": to_json(&product)?,
                "low_stock": product.is_low_stock(),
                "prediction": to_json(&prediction)?,
            }))
        }

        ProductCommand::AssignVendor { product, vendor } => {
            let product_id = ctx.product_id(&product).await?;
            let vendor_id = match vendor {
                Some(vendor) => Some(ctx.vendor_id(&vendor).await?),
                None => None,
            };
            to_json(
                &ctx.engine
                    .assign_vendor(&product_id, vendor_id.as_deref(), &ctx.actor)
                    .await?,
            )
        }

        ProductCommand::Reorder {
            product,
            level,
            quantity,
        } => {
            let product_id = ctx.product_id(&product).await?;
            to_json(&ctx.engine.set_reorder(&product_id, level, quantity, &ctx.actor).await?)
        }
    }
}
