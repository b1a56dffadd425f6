//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary, so a fresh
//! `shelfctl` or test database needs nothing on disk but its own file.
//!
//! New schema changes go in a new `NNN_description.sql`; applied files are
//! checksummed by sqlx and must not be edited afterwards.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await.unwrap_or((MIGRATOR.migrations.len(), 0));
    debug!(total, applied, "Migration status");

    MIGRATOR.run(pool).await?;

    if applied < total {
        info!(applied = total - applied, "Schema migrated");
    }
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
