//! # CLI Error Type
//!
//! Unified error type for shelfctl commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in shelfctl                               │
//! │                                                                         │
//! │  shelfctl order approve PO-20240301-ABCDEF12                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command handler: Result<(), ApiError>                           │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  EngineError ── kind() ──► ErrorCode ──► ApiError               │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stderr: {"code":"CONFLICT","message":"cannot approve order ..."}       │
//! │  exit status: 5                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Code         | Exit |
//! |--------------|------|
//! | (success)    | 0    |
//! | INTERNAL     | 1    |
//! | VALIDATION   | 2    |
//! | FORBIDDEN    | 3    |
//! | NOT_FOUND    | 4    |
//! | CONFLICT     | 5    |
//! | UNAVAILABLE  | 6    |

use serde::Serialize;
use shelf_core::{CoreError, ErrorKind};
use shelf_db::DbError;
use shelf_engine::EngineError;

/// Error printed to stderr when a command fails.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: SKU-123"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for scripts
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes, one per engine error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    Forbidden,
    NotFound,
    /// Invalid transition or insufficient stock
    Conflict,
    Unavailable,
    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::Validation => 2,
            ErrorCode::Forbidden => 3,
            ErrorCode::NotFound => 4,
            ErrorCode::Conflict => 5,
            ErrorCode::Unavailable => 6,
        }
    }
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCode::Validation,
            ErrorKind::Forbidden => ErrorCode::Forbidden,
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::Unavailable => ErrorCode::Unavailable,
            ErrorKind::Internal => ErrorCode::Internal,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.code.exit_code()
    }

    /// Single-line JSON form for stderr.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL","message":"{}"}}"#, self.message.escape_default())
        })
    }
}

/// Converts engine errors to CLI errors.
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let code = ErrorCode::from(err.kind());
        if code == ErrorCode::Internal {
            // Log the full error, it may carry driver details
            tracing::error!(error = ?err, "Internal error");
        }
        ApiError::new(code, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        EngineError::from(err).into()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::validation(format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal(format!("I/O error: {}", err))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::OrderStatus;

    #[test]
    fn test_exit_codes_by_kind() {
        let cases = [
            (CoreError::InvalidQuantity { quantity: 0 }, 2),
            (CoreError::forbidden("no"), 3),
            (CoreError::not_found("Product", "p-1"), 4),
            (
                CoreError::InsufficientStock {
                    product_id: "p-1".into(),
                    available: 1,
                    requested: 2,
                },
                5,
            ),
            (
                CoreError::InvalidTransition {
                    order_id: "o-1".into(),
                    current: OrderStatus::Completed,
                    event: "complete".into(),
                },
                5,
            ),
        ];

        for (err, exit) in cases {
            assert_eq!(ApiError::from(err).exit_code(), exit);
        }
    }

    #[test]
    fn test_json_shape() {
        let err = ApiError::from(CoreError::not_found("Order", "o-9"));
        let json: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json["message"].as_str().unwrap().contains("o-9"));
    }
}
