//! # Repository Module
//!
//! Database repository implementations for Shelf.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine service (Ledger, OrderService, RestockService)                 │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(id)                                   │
//! │       │  ProductRepository::try_adjust_quantity(&mut tx, ...)          │
//! │       ▼                                                                 │
//! │  Repository                                                            │
//! │  ├── &self methods       → run on the pool (reads, standalone writes)  │
//! │  └── associated fns      → take `&mut SqliteConnection` so several     │
//! │                            writes share one transaction                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Products and the conditional stock update
//! - [`MovementRepository`] - Append-only stock ledger
//! - [`PurchaseOrderRepository`] - Orders and compare-and-set status updates
//! - [`VendorRepository`] - Vendors
//! - [`NotificationOutboxRepository`] - Pending notifications
//!
//! [`ProductRepository`]: product::ProductRepository
//! [`MovementRepository`]: movement::MovementRepository
//! [`PurchaseOrderRepository`]: purchase_order::PurchaseOrderRepository
//! [`VendorRepository`]: vendor::VendorRepository
//! [`NotificationOutboxRepository`]: outbox::NotificationOutboxRepository

pub mod movement;
pub mod outbox;
pub mod product;
pub mod purchase_order;
pub mod vendor;

/// Generates a new entity ID (UUID v4).
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
