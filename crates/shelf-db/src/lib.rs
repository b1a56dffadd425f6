//! # shelf-db: Database Layer for Shelf
//!
//! This crate provides database access for the Shelf replenishment core.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Data Flow                                  │
//! │                                                                         │
//! │  shelf-engine (Ledger::record_out)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     shelf-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ MovementRepo  │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ OrderRepo     │    │              │  │   │
//! │  │   │               │    │ OutboxRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shelf.db")).await?;
//! let low = db.products().list_low_stock().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::generate_id;
pub use repository::movement::MovementRepository;
pub use repository::outbox::{NotificationOutboxRepository, OutboxEntry};
pub use repository::product::{NewProduct, ProductRepository, StockUpdate};
pub use repository::purchase_order::{PurchaseOrderRepository, StatusUpdate};
pub use repository::vendor::VendorRepository;
