//! # shelfctl
//!
//! Operator CLI for the Shelf replenishment core.
//!
//! ```text
//! shelfctl [--config shelf.toml] [--actor NAME] [--role ROLE] <group> <command>
//!
//!   vendor   add | list
//!   product  add | list | show | assign-vendor | reorder
//!   stock    in | out | history
//!   order    create | batch | approve | reject | accept | dispatch
//!            complete | delete | list | show
//!   restock  suggest
//!   outbox   flush | status | cleanup
//! ```
//!
//! Results are printed as pretty JSON on stdout. Logs go to stderr, filtered
//! by `RUST_LOG`.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shelf_core::{Actor, Role};
use shelf_engine::{Engine, EngineConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::{Context, OrderCommand, OutboxCommand, ProductCommand, RestockCommand, StockCommand, VendorCommand};
use error::ApiError;

#[derive(Debug, Parser)]
#[command(name = "shelfctl", about = "Shelf inventory and replenishment CLI", version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identity of the caller; vendors use their email
    #[arg(long, global = true, default_value = "admin")]
    actor: String,

    /// Role of the caller: admin, manager or vendor
    #[arg(long, global = true, default_value = "admin")]
    role: Role,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage vendors
    #[command(subcommand)]
    Vendor(VendorCommand),

    /// Manage the product catalog
    #[command(subcommand)]
    Product(ProductCommand),

    /// Record and inspect stock movements
    #[command(subcommand)]
    Stock(StockCommand),

    /// Purchase order lifecycle
    #[command(subcommand)]
    Order(OrderCommand),

    /// Restock recommendations
    #[command(subcommand)]
    Restock(RestockCommand),

    /// Notification outbox maintenance
    #[command(subcommand)]
    Outbox(OutboxCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.to_json());
            ExitCode::from(e.exit_code())
        }
    }
}

/// Initializes the tracing subscriber.
///
/// Uses `RUST_LOG` when set, otherwise a sensible default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,shelf=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<String, ApiError> {
    let config = EngineConfig::load(cli.config)?;

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(path = ?config.database.path, "Opening database");

    let engine = Engine::open(config).await?;
    let ctx = Context::new(engine, Actor::new(cli.actor, cli.role));
    debug!(actor = %ctx.actor.identity, role = ?ctx.actor.role, "Running command");

    let output = match cli.command {
        Command::Vendor(cmd) => commands::vendor::run(cmd, &ctx).await?,
        Command::Product(cmd) => commands::product::run(cmd, &ctx).await?,
        Command::Stock(cmd) => commands::stock::run(cmd, &ctx).await?,
        Command::Order(cmd) => commands::order::run(cmd, &ctx).await?,
        Command::Restock(cmd) => commands::restock::run(cmd, &ctx).await?,
        Command::Outbox(cmd) => commands::outbox::run(cmd, &ctx).await?,
    };

    ctx.engine.db().close().await;
    Ok(serde_json::to_string_pretty(&output)?)
}
