//! # Validation Module
//!
//! Input validation for commands entering the core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI (clap)                                                   │
//! │  └── Type validation (argument parsing)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation before any state is touched              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0), CHECK (quantity > 0)                       │
//! │  ├── UNIQUE sku / order_number                                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for a single movement or order line.
pub const MAX_MOVEMENT_QUANTITY: i64 = 1_000_000;

// =============================================================================
// Quantities
// =============================================================================

/// Validates a movement quantity.
///
/// Zero and negative quantities fail with `InvalidQuantity`, which is the
/// error the ledger contract names; absurdly large ones fail validation.
///
/// ```rust
/// use shelf_core::validation::validate_movement_quantity;
///
/// assert!(validate_movement_quantity(5).is_ok());
/// assert!(validate_movement_quantity(0).is_err());
/// ```
pub fn validate_movement_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    if quantity > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        }
        .into());
    }
    Ok(())
}

/// Validates a purchase-order quantity.
pub fn validate_order_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }
    Ok(())
}

/// Validates reorder parameters on a product.
///
/// Both must be at least 1.
pub fn validate_reorder_settings(reorder_level: i64, reorder_quantity: i64) -> ValidationResult<()> {
    if reorder_level < 1 {
        return Err(ValidationError::OutOfRange {
            field: "reorder_level".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }
    if reorder_quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "reorder_quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Strings
// =============================================================================

/// Validates a SKU: 1-50 characters of letters, digits, `-` or `_`.
///
/// ```rust
/// use shelf_core::validation::validate_sku;
///
/// assert!(validate_sku("MILK-1L").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required free-text field such as a product or vendor name.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Minimal email shape check: one `@` with text on both sides and a dot after it.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: format!("'{}' is not an email address", email),
        });
    }

    Ok(())
}

/// Validates a rejection reason.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    validate_name("reason", reason)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_quantity() {
        assert!(validate_movement_quantity(1).is_ok());
        assert_eq!(
            validate_movement_quantity(0),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        );
        assert_eq!(
            validate_movement_quantity(-4),
            Err(CoreError::InvalidQuantity { quantity: -4 })
        );
        assert!(matches!(
            validate_movement_quantity(MAX_MOVEMENT_QUANTITY + 1),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_order_quantity() {
        assert!(validate_order_quantity(20).is_ok());
        assert!(validate_order_quantity(0).is_err());
    }

    #[test]
    fn test_sku() {
        assert!(validate_sku("ABC_123-x").is_ok());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("orders@acme.com").is_ok());
        assert!(validate_email("acme.com").is_err());
        assert!(validate_email("@acme.com").is_err());
        assert!(validate_email("orders@acme").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_reorder_settings() {
        assert!(validate_reorder_settings(10, 20).is_ok());
        assert!(validate_reorder_settings(1, 20).is_ok());
        // A level of 0 would read as "unset" to the restock engine
        assert!(matches!(
            validate_reorder_settings(0, 20),
            Err(ValidationError::OutOfRange { min: 1, .. })
        ));
        assert!(validate_reorder_settings(-1, 20).is_err());
        assert!(validate_reorder_settings(10, 0).is_err());
    }
}
