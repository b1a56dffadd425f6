//! # shelf-core: Pure Inventory Logic for Shelf
//!
//! This crate is the **heart** of Shelf. It holds the domain types, the
//! purchase-order rules and the demand / restock formulas as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    shelfctl (operator CLI)                      │   │
//! │  │    stock in/out ──► order approve/accept/... ──► restock suggest│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │      shelf-engine (ledger, orders, hooks, notification outbox)  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shelf-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ analytics │  │  restock  │  │   order   │  │   │
//! │  │   │  Product  │  │  Demand   │  │  Urgency  │  │ Transition│  │   │
//! │  │   │  PO, Role │  │ Analytics │  │ Confidence│  │   table   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    shelf-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, PurchaseOrder, Actor, ...)
//! - [`analytics`] - Demand analytics over a movement history
//! - [`restock`] - Restock recommendation, urgency and confidence
//! - [`order`] - Purchase-order transition table and authorization
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use shelf_core::analytics::analyze;
//! use shelf_core::restock::{recommend, Urgency};
//! use shelf_core::Product;
//!
//! let now = Utc::now();
//! let product = Product {
//!     id: "p-1".into(),
//!     sku: "MILK-1L".into(),
//!     name: "Milk 1L".into(),
//!     quantity: 2,
//!     reorder_level: 10,
//!     reorder_quantity: 20,
//!     vendor_id: None,
//!     unit_price_cents: 129,
//!     created_at: now,
//!     updated_at: now,
//! };
//!
//! let prediction = recommend(&product, &analyze(&[]));
//! assert_eq!(prediction.urgency, Urgency::Critical);
//! assert!(prediction.recommended_quantity >= 20);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod analytics;
pub mod error;
pub mod order;
pub mod restock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use analytics::{DataQuality, DemandAnalytics};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use order::{AcceptPolicy, OrderEvent};
pub use restock::{RestockPrediction, Urgency};
pub use types::*;
