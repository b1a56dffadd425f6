//! `shelfctl order ...`
//!
//! Orders are referenced by order number (`PO-YYYYMMDD-XXXXXXXX`) or ID.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use serde_json::Value;
use shelf_core::OrderStatus;
use shelf_engine::{BatchLine, NewOrder};

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// Create a pending order
    Create {
        /// SKU or product ID
        product: String,
        quantity: i64,
        /// Vendor email or ID; defaults to the product's vendor
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Create one order per line, grouped by vendor
    Batch {
        /// JSON array of {product_id, quantity, vendor_id?}
        #[arg(long, conflicts_with = "from_suggestions", required_unless_present = "from_suggestions")]
        file: Option<PathBuf>,

        /// Use the current restock suggestions as the lines
        #[arg(long)]
        from_suggestions: bool,
    },

    /// Approve a pending order
    Approve { order: String },

    /// Reject a pending order
    Reject {
        order: String,
        #[arg(long)]
        reason: String,
    },

    /// Accept an order as its vendor
    Accept {
        order: String,
        /// Expected delivery date (YYYY-MM-DD)
        #[arg(long)]
        delivery_date: Option<NaiveDate>,
    },

    /// Mark an accepted order as shipped
    Dispatch {
        order: String,
        #[arg(long)]
        tracking: Option<String>,
    },

    /// Receive a dispatched order into stock
    Complete { order: String },

    /// Delete a pending or rejected order
    Delete { order: String },

    /// List orders visible to the caller
    List {
        #[arg(long)]
        status: Option<OrderStatus>,
        /// Only orders for this vendor (email or ID)
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Show one order
    Show { order: String },
}

pub async fn run(cmd: OrderCommand, ctx: &Context) -> Result<Value, ApiError> {
    let engine = &ctx.engine;
    let actor = &ctx.actor;

    match cmd {
        OrderCommand::Create {
            product,
            quantity,
            vendor,
            notes,
        } => {
            let vendor_id = match vendor {
                Some(vendor) => Some(ctx.vendor_id(&vendor).await?),
                None => None,
            };
            let request = NewOrder {
                product_id: ctx.product_id(&product).await?,
                quantity,
                vendor_id,
                notes,
            };
            to_json(&engine.create_order(request, actor).await?)
        }

        OrderCommand::Batch {
            file,
            from_suggestions,
        } => {
            let lines = if from_suggestions {
                suggested_lines(ctx).await?
            } else {
                match file {
                    Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                    None => return Err(ApiError::validation("either --file or --from-suggestions is required")),
                }
            };
            to_json(&engine.create_orders(lines, actor).await?)
        }

        OrderCommand::Approve { order } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.approve_order(&id, actor).await?)
        }

        OrderCommand::Reject { order, reason } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.reject_order(&id, &reason, actor).await?)
        }

        OrderCommand::Accept {
            order,
            delivery_date,
        } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.accept_order(&id, delivery_date, actor).await?)
        }

        OrderCommand::Dispatch { order, tracking } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.dispatch_order(&id, tracking.as_deref(), actor).await?)
        }

        OrderCommand::Complete { order } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.complete_order(&id, actor).await?)
        }

        OrderCommand::Delete { order } => {
            let id = ctx.order_id(&order).await?;
            to_json(&engine.delete_order(&id, actor).await?)
        }

        OrderCommand::List { status, vendor } => {
            let mut orders = engine.orders().list_visible(actor, status).await?;
            if let Some(vendor) = vendor {
                let vendor_id = ctx.vendor_id(&vendor).await?;
                orders.retain(|o| o.vendor_id == vendor_id);
            }
            to_json(&orders)
        }

        OrderCommand::Show { order } => to_json(&engine.orders().find(&order).await?),
    }
}

/// Restock suggestions as batch lines, one per product.
async fn suggested_lines(ctx: &Context) -> Result<Vec<BatchLine>, ApiError> {
    Ok(ctx
        .engine
        .restock_suggestions()
        .await?
        .into_iter()
        .map(|p| BatchLine {
            product_id: p.product_id,
            quantity: p.recommended_quantity,
            vendor_id: p.vendor_id,
        })
        .collect())
}
