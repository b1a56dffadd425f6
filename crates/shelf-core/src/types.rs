//! # Domain Types
//!
//! Core domain types used throughout Shelf.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │ StockMovement   │   │ PurchaseOrder   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  product_id     │   │  order_number   │       │
//! │  │  quantity       │◄──│  direction      │   │  status         │       │
//! │  │  reorder_level  │   │  quantity (>0)  │   │  vendor_contact │       │
//! │  │  vendor_id      │   │  occurred_at    │   │  product_name   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Vendor      │   │  Actor / Role   │   │  Notification   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, email      │   │  identity       │   │  audience       │       │
//! │  │  is_active      │   │  Admin/Manager/ │   │  message        │       │
//! │  │                 │   │  Vendor         │   │  priority       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single Canonical Fields
//! Each concept has exactly one stored field. Values such as "is this product
//! low on stock" are derived on read (see [`Product::is_low_stock`]) rather
//! than kept in a second column that would need to be synchronized.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Reorder level used when a product has none configured.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;

/// Reorder quantity used when a product has none configured.
pub const DEFAULT_REORDER_QUANTITY: i64 = 20;

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `quantity` is mutated only by the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    pub name: String,

    /// Authoritative current stock, never negative.
    pub quantity: i64,

    /// At or below this level a stock-out raises a low-stock signal.
    pub reorder_level: i64,

    /// Quantity ordered by the automatic replenishment path.
    pub reorder_quantity: i64,

    /// Vendor that supplies this product, if any.
    pub vendor_id: Option<String>,

    /// Unit price in cents.
    pub unit_price_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// True when stock is at or below the stored reorder level.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Reorder level with the default applied when the stored one is unset.
    ///
    /// A stored value of zero or below counts as unset. Validation refuses
    /// such levels, so only rows written around the engine can hold one.
    #[inline]
    pub fn effective_reorder_level(&self) -> i64 {
        if self.reorder_level > 0 {
            self.reorder_level
        } else {
            DEFAULT_REORDER_LEVEL
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementDirection {
    /// Stock received.
    In,
    /// Stock consumed or shipped.
    Out,
}

impl fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementDirection::In => f.write_str("IN"),
            MovementDirection::Out => f.write_str("OUT"),
        }
    }
}

/// A single immutable entry in the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: MovementDirection,
    /// Always positive; the sign comes from `direction`.
    pub quantity: i64,
    pub notes: Option<String>,
    /// Identity of whoever recorded the movement.
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    /// Quantity with the direction applied (+IN, -OUT).
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        match self.direction {
            MovementDirection::In => self.quantity,
            MovementDirection::Out => -self.quantity,
        }
    }
}

/// Raised when a stock-out leaves a product at or below its reorder level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockSignal {
    pub product_id: String,
    pub new_quantity: i64,
    pub reorder_level: i64,
}

// =============================================================================
// Purchase Order Status
// =============================================================================

/// Lifecycle state of a purchase order.
///
/// ```text
/// PENDING ──► APPROVED ──► ACCEPTED ──► DISPATCHED ──► COMPLETED
///    │  └─────────────────────▲
///    │            │           │
///    └────────────┴───────────┴──► REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Approved,
    Accepted,
    Dispatched,
    Completed,
    Rejected,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Approved,
        OrderStatus::Accepted,
        OrderStatus::Dispatched,
        OrderStatus::Completed,
        OrderStatus::Rejected,
    ];

    /// No transition leaves a terminal status.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Rejected)
    }

    /// Only PENDING and REJECTED orders may be physically deleted.
    #[inline]
    pub fn is_deletable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Dispatched => "DISPATCHED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Purchase Order
// =============================================================================

/// A replenishment order placed with a vendor.
///
/// `vendor_contact` and `product_name` are snapshots taken at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: String,
    /// Human-readable, unique (`PO-YYYYMMDD-XXXXXXXX`).
    pub order_number: String,
    pub vendor_id: String,
    /// Vendor email at creation time; vendor actors are matched against it.
    pub vendor_contact: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub dispatch_tracking: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Appends a note, joining with `" | "` when notes already exist.
    pub fn appended_notes(&self, note: &str) -> String {
        match self.notes.as_deref() {
            Some(existing) if !existing.trim().is_empty() => format!("{} | {}", existing, note),
            _ => note.to_string(),
        }
    }
}

// =============================================================================
// Vendor
// =============================================================================

/// A supplier. Inactive vendors are treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Vendor {
    pub id: String,
    pub name: String,
    /// Contact email; also the identity a vendor actor authenticates as.
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Actors & Roles
// =============================================================================

/// Closed set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Vendor,
}

impl Role {
    /// Admins and managers are "staff".
    #[inline]
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Vendor => "VENDOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" | "store_manager" => Ok(Role::Manager),
            "vendor" => Ok(Role::Vendor),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".into(), "manager".into(), "vendor".into()],
            }),
        }
    }
}

/// Whoever performs an operation. Authentication happens outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Username or email. Vendors are identified by their email.
    pub identity: String,
    pub role: Role,
}

/// Identity recorded on orders created by the replenishment path.
pub const SYSTEM_IDENTITY: &str = "SYSTEM";

impl Actor {
    pub fn new(identity: impl Into<String>, role: Role) -> Self {
        Actor {
            identity: identity.into(),
            role,
        }
    }

    pub fn admin(identity: impl Into<String>) -> Self {
        Actor::new(identity, Role::Admin)
    }

    pub fn manager(identity: impl Into<String>) -> Self {
        Actor::new(identity, Role::Manager)
    }

    pub fn vendor(email: impl Into<String>) -> Self {
        Actor::new(email, Role::Vendor)
    }

    /// The actor used for automatically generated orders.
    pub fn system() -> Self {
        Actor::new(SYSTEM_IDENTITY, Role::Admin)
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Audience {
    /// Everyone holding a role.
    Role(Role),
    /// A single user, by identity (email for vendors).
    Identity(String),
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Role(role) => write!(f, "role:{}", role),
            Audience::Identity(identity) => write!(f, "user:{}", identity),
        }
    }
}

impl FromStr for Audience {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(role) = s.strip_prefix("role:") {
            return Ok(Audience::Role(role.parse()?));
        }
        if let Some(identity) = s.strip_prefix("user:") {
            if !identity.is_empty() {
                return Ok(Audience::Identity(identity.to_string()));
            }
        }
        Err(ValidationError::InvalidFormat {
            field: "audience".to_string(),
            reason: format!("expected role:<ROLE> or user:<identity>, got '{}'", s),
        })
    }
}

/// Notification urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Normal,
    High,
}

/// A fire-and-forget message for the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub message: String,
    pub priority: Priority,
}

impl Notification {
    pub fn new(audience: Audience, message: impl Into<String>, priority: Priority) -> Self {
        Notification {
            audience,
            message: message.into(),
            priority,
        }
    }

    /// Normal-priority notification.
    pub fn normal(audience: Audience, message: impl Into<String>) -> Self {
        Notification::new(audience, message, Priority::Normal)
    }

    /// High-priority notification.
    pub fn high(audience: Audience, message: impl Into<String>) -> Self {
        Notification::new(audience, message, Priority::High)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64, reorder_level: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".into(),
            sku: "SKU-1".into(),
            name: "Widget".into(),
            quantity,
            reorder_level,
            reorder_quantity: DEFAULT_REORDER_QUANTITY,
            vendor_id: None,
            unit_price_cents: 100,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(10, 10).is_low_stock());
        assert!(!product(11, 10).is_low_stock());
    }

    #[test]
    fn test_effective_reorder_level_defaults_when_unset() {
        assert_eq!(product(5, 0).effective_reorder_level(), DEFAULT_REORDER_LEVEL);
        assert_eq!(product(5, -3).effective_reorder_level(), DEFAULT_REORDER_LEVEL);
        assert_eq!(product(5, 4).effective_reorder_level(), 4);
    }

    #[test]
    fn test_order_status_parse_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_terminal_and_deletable() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Dispatched.is_terminal());

        let deletable: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_deletable)
            .collect();
        assert_eq!(deletable, vec![OrderStatus::Pending, OrderStatus::Rejected]);
    }

    #[test]
    fn test_audience_round_trips_through_text() {
        let role = Audience::Role(Role::Manager);
        assert_eq!(role.to_string(), "role:MANAGER");
        assert_eq!("role:MANAGER".parse::<Audience>().unwrap(), role);

        let user = Audience::Identity("acme@example.com".into());
        assert_eq!("user:acme@example.com".parse::<Audience>().unwrap(), user);

        assert!("team:ops".parse::<Audience>().is_err());
        assert!("user:".parse::<Audience>().is_err());
    }

    #[test]
    fn test_signed_quantity() {
        let mut movement = StockMovement {
            id: "m".into(),
            product_id: "p".into(),
            direction: MovementDirection::In,
            quantity: 7,
            notes: None,
            actor: "alice".into(),
            occurred_at: Utc::now(),
        };
        assert_eq!(movement.signed_quantity(), 7);
        movement.direction = MovementDirection::Out;
        assert_eq!(movement.signed_quantity(), -7);
    }

    #[test]
    fn test_serde_uses_uppercase_variants() {
        let json = serde_json::to_string(&OrderStatus::Dispatched).unwrap();
        assert_eq!(json, "\"DISPATCHED\"");
        let json = serde_json::to_string(&MovementDirection::Out).unwrap();
        assert_eq!(json, "\"OUT\"");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("store_manager".parse::<Role>().unwrap(), Role::Manager);
        assert!("cashier".parse::<Role>().is_err());
        assert!(Role::Manager.is_staff());
        assert!(!Role::Vendor.is_staff());
    }
}
