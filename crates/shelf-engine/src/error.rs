//! # Engine Error Types
//!
//! One error type for every service in this crate.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Domain      │  │    Database     │  │   Configuration         │ │
//! │  │  (CoreError)    │  │   (DbError)     │  │                         │ │
//! │  │                 │  │                 │  │  InvalidConfig          │ │
//! │  │  NotFound       │  │  UniqueViolation│  │  ConfigLoadFailed       │ │
//! │  │  InsufficientStk│  │  PoolExhausted  │  │                         │ │
//! │  │  InvalidTransit.│  │  QueryFailed    │  ├─────────────────────────┤ │
//! │  │  Forbidden      │  │  ...            │  │   Notifications         │ │
//! │  └─────────────────┘  └─────────────────┘  │  DeliveryFailed         │ │
//! │                                             │  ChannelError           │ │
//! │                                             └─────────────────────────┘ │
//! │                                                                         │
//! │  Every variant maps to a stable ErrorKind via `kind()`.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shelf_core::{CoreError, ErrorKind, ValidationError};
use shelf_db::DbError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation from shelf-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure from shelf-db.
    #[error(transparent)]
    Db(#[from] DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read or parsed.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Notification Errors
    // =========================================================================
    /// A notification sink refused a message.
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl EngineError {
    /// Returns the stable kind of this error.
    ///
    /// ```text
    /// Core(e)                         → e.kind()
    /// Db(NotFound)                    → NotFound
    /// Db(UniqueViolation)             → Conflict
    /// Db(ForeignKey / Check)          → Validation
    /// Db(PoolExhausted / Connection)  → Unavailable
    /// InvalidConfig / ConfigLoad      → Validation
    /// DeliveryFailed                  → Unavailable
    /// everything else                → Internal
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(e) => e.kind(),
            EngineError::Db(e) => match e {
                DbError::NotFound { .. } => ErrorKind::NotFound,
                DbError::UniqueViolation { .. } => ErrorKind::Conflict,
                DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                    ErrorKind::Validation
                }
                DbError::PoolExhausted | DbError::ConnectionFailed(_) => ErrorKind::Unavailable,
                _ => ErrorKind::Internal,
            },
            EngineError::InvalidConfig(_) | EngineError::ConfigLoadFailed(_) => {
                ErrorKind::Validation
            }
            EngineError::DeliveryFailed(_) => ErrorKind::Unavailable,
            EngineError::ChannelError(_) => ErrorKind::Internal,
        }
    }

    /// The wrapped domain error, if any.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}
