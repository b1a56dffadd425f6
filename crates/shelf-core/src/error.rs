//! # Error Types
//!
//! Domain-specific error types for shelf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelf-core errors (this file)                                         │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shelf-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  shelf-engine errors                                                   │
//! │  └── EngineError      - Core + Db + Config, one stable ErrorKind       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → CLI exit code       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error exposes an [`ErrorKind`] so that outer surfaces can map it to
//! a stable code without matching on individual variants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Stable classification of every rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input failed validation (bad quantity, empty field).
    Validation,
    /// Actor's role or identity does not satisfy the precondition.
    Forbidden,
    /// Referenced product, order or vendor does not exist.
    NotFound,
    /// State precondition violated (insufficient stock, invalid transition).
    Conflict,
    /// A collaborator needed for a best-effort path is missing.
    Unavailable,
    /// Anything else (storage failure, misconfiguration).
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These errors represent business rule violations. They carry enough
/// context for the caller to act (current stock, current status).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Product, order or vendor cannot be found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A movement quantity was zero or negative.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// Stock-out exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// recordOut(qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Quantity unchanged, no movement written
    /// ```
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Purchase order is not in a state that allows the event.
    #[error("Order {order_id} is {current}, cannot {event}")]
    InvalidTransition {
        order_id: String,
        current: OrderStatus,
        event: String,
    },

    /// Actor's role or identity does not allow the operation.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// A dependency needed for a best-effort path is missing.
    #[error("Dependency unavailable: {reason}")]
    DependencyUnavailable { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InvalidQuantity { .. } | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::InsufficientStock { .. } | CoreError::InvalidTransition { .. } => {
                ErrorKind::Conflict
            }
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
            CoreError::DependencyUnavailable { .. } => ErrorKind::Unavailable,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid email, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 3, requested 5"
        );

        let err = CoreError::InvalidTransition {
            order_id: "o-1".to_string(),
            current: OrderStatus::Completed,
            event: "complete".to_string(),
        };
        assert_eq!(err.to_string(), "Order o-1 is COMPLETED, cannot complete");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::not_found("Product", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InvalidQuantity { quantity: 0 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(CoreError::forbidden("nope").kind(), ErrorKind::Forbidden);
        assert_eq!(
            CoreError::DependencyUnavailable {
                reason: "no vendor".into()
            }
            .kind(),
            ErrorKind::Unavailable
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
