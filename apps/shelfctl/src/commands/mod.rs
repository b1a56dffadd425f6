//! Command handlers.
//!
//! Each group owns a clap subcommand enum and a `run` function that maps the
//! parsed command onto one engine call and returns the result as JSON.

pub mod order;
pub mod outbox;
pub mod product;
pub mod restock;
pub mod stock;
pub mod vendor;

pub use order::OrderCommand;
pub use outbox::OutboxCommand;
pub use product::ProductCommand;
pub use restock::RestockCommand;
pub use stock::StockCommand;
pub use vendor::VendorCommand;

use serde::Serialize;
use serde_json::Value;
use shelf_core::Actor;
use shelf_engine::Engine;

use crate::error::ApiError;

/// What every handler runs against.
pub struct Context {
    pub engine: Engine,
    pub actor: Actor,
}

impl Context {
    pub fn new(engine: Engine, actor: Actor) -> Self {
        Context { engine, actor }
    }

    /// Resolves a product reference (SKU or ID) to its ID.
    pub async fn product_id(&self, reference: &str) -> Result<String, ApiError> {
        Ok(self.engine.product(reference).await?.id)
    }

    /// Resolves a vendor reference (contact email or ID) to its ID.
    pub async fn vendor_id(&self, reference: &str) -> Result<String, ApiError> {
        Ok(self.engine.find_vendor(reference).await?.id)
    }

    /// Resolves an order reference (order number or ID) to its ID.
    pub async fn order_id(&self, reference: &str) -> Result<String, ApiError> {
        Ok(self.engine.orders().find(reference).await?.id)
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use shelf_db::{Database, DbConfig};
    use shelf_engine::EngineConfig;

    pub async fn context() -> Context {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Context::new(Engine::new(db, EngineConfig::default()), Actor::admin("admin"))
    }

    pub fn as_vendor(ctx: Context, email: &str) -> Context {
        Context::new(ctx.engine, Actor::vendor(email))
    }
}
