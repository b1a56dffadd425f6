//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Engine / CLI startup                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Readers run in parallel; one writer at a time (SQLite), the rest      │
//! │  wait up to `busy_timeout`.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write-First Transactions
//! Every transaction that mutates stock or order status starts with its
//! conditional `UPDATE`, so it takes the write lock on its first statement
//! and never has to upgrade a read snapshot (which SQLite would refuse with
//! `SQLITE_BUSY` instead of waiting).

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::movement::MovementRepository;
use crate::repository::outbox::NotificationOutboxRepository;
use crate::repository::product::ProductRepository;
use crate::repository::purchase_order::PurchaseOrderRepository;
use crate::repository::vendor::VendorRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/shelf.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long `acquire` waits for a free connection.
    pub connect_timeout: Duration,
    /// How long a writer waits on another writer's lock before `SQLITE_BUSY`.
    /// Stock and order writers serialize on this, so keep it above the
    /// longest expected transaction.
    pub busy_timeout: Duration,
    /// `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration: 5 connections, 5s busy timeout, migrations on.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory database for tests.
    ///
    /// Exactly one connection, never reaped: the database is gone once it
    /// closes. Anything holding an open transaction blocks every other caller.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the Shelf database; hands out repositories.
///
/// Clones share one pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./shelf.db")).await?;
/// let low = db.products().list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies migrations.
    ///
    /// Connections run in WAL mode with foreign keys on and the configured
    /// busy timeout, so concurrent writers queue instead of failing.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening shelf database");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction.
    ///
    /// Callers issue their conditional write first (see module docs).
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Append-only stock movement log.
    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> PurchaseOrderRepository {
        PurchaseOrderRepository::new(self.pool.clone())
    }

    pub fn vendors(&self) -> VendorRepository {
        VendorRepository::new(self.pool.clone())
    }

    pub fn outbox(&self) -> NotificationOutboxRepository {
        NotificationOutboxRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        debug!("Closing shelf database");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/shelf-test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
