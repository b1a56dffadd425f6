//! `shelfctl outbox ...`

use std::sync::Arc;

use clap::Subcommand;
use serde_json::{json, Value};
use shelf_engine::LogSink;

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum OutboxCommand {
    /// Deliver one batch of pending notifications to the log
    Flush,

    /// Count pending notifications
    Status,

    /// Delete delivered notifications older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

pub async fn run(cmd: OutboxCommand, ctx: &Context) -> Result<Value, ApiError> {
    match cmd {
        OutboxCommand::Flush => {
            let (dispatcher, _handle) = ctx.engine.outbox_dispatcher(Arc::new(LogSink));
            to_json(&dispatcher.dispatch_pending().await?)
        }

        OutboxCommand::Status => {
            let pending = ctx.engine.db().outbox().count_pending().await?;
            Ok(json!({ "pending": pending }))
        }

        OutboxCommand::Cleanup { days } => {
            let deleted = ctx.engine.db().outbox().cleanup_delivered(days).await?;
            Ok(json!({ "deleted": deleted }))
        }
    }
}
