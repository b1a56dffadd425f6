//! # Database Errors
//!
//! [`DbError`] classifies sqlx failures so the engine can tell a duplicate
//! SKU (the caller's problem) from a locked or closed pool (try again later).
//!
//! ```text
//! sqlx::Error ──► DbError ──► EngineError::Db ──► ErrorKind
//!
//!   UNIQUE constraint failed: products.sku   → UniqueViolation { field: "sku" }
//!   FOREIGN KEY constraint failed            → ForeignKeyViolation
//!   CHECK constraint failed: quantity >= 0   → CheckViolation
//!   PoolTimedOut                             → PoolExhausted
//!   PoolClosed                               → ConnectionFailed
//! ```

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Duplicate SKU, vendor email or order number.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A movement, order or product pointing at a row that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The schema refused a value (negative stock, unknown status).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Maps a SQLite error message onto a constraint variant.
    fn from_sqlite_message(msg: &str) -> Self {
        if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
            // "products.sku" or "t.a, t.b"; report the first column name
            let first = columns.split(',').next().unwrap_or(columns).trim();
            let field = first.rsplit('.').next().unwrap_or(first);
            DbError::duplicate(field, "unknown")
        } else if msg.contains("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation {
                message: msg.to_string(),
            }
        } else if msg.contains("CHECK constraint failed") {
            DbError::CheckViolation {
                message: msg.to_string(),
            }
        } else {
            DbError::QueryFailed(msg.to_string())
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_messages_are_classified() {
        assert!(matches!(
            DbError::from_sqlite_message("UNIQUE constraint failed: products.sku"),
            DbError::UniqueViolation { field, .. } if field == "sku"
        ));
        assert!(matches!(
            DbError::from_sqlite_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(
            DbError::from_sqlite_message("CHECK constraint failed: quantity >= 0"),
            DbError::CheckViolation { .. }
        ));
        assert!(matches!(
            DbError::from_sqlite_message("database is locked"),
            DbError::QueryFailed(_)
        ));
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(DbError::from(sqlx::Error::PoolClosed), DbError::ConnectionFailed(_)));
    }
}
