//! # Vendor Repository
//!
//! Database operations for vendors.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use shelf_core::Vendor;

/// Repository for vendor operations.
#[derive(Debug, Clone)]
pub struct VendorRepository {
    pool: SqlitePool,
}

impl VendorRepository {
    /// Creates a new VendorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VendorRepository { pool }
    }

    /// Inserts a new active vendor.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn insert(&self, name: &str, email: &str) -> DbResult<Vendor> {
        debug!(email = %email, "Inserting vendor");

        let vendor = Vendor {
            id: generate_id(),
            name: name.to_string(),
            email: email.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO vendors (id, name, email, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.email)
        .bind(vendor.is_active)
        .bind(vendor.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, email),
            other => other,
        })?;

        Ok(vendor)
    }

    /// Gets a vendor by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Vendor>> {
        let vendor = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vendor)
    }

    /// Gets a vendor by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Vendor>> {
        let vendor =
            sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE email = ?1 COLLATE NOCASE")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(vendor)
    }

    /// Lists all vendors by name.
    pub async fn list(&self) -> DbResult<Vec<Vendor>> {
        let vendors = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(vendors)
    }

    /// Activates or deactivates a vendor.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<Vendor> {
        sqlx::query_as::<_, Vendor>("UPDATE vendors SET is_active = ?2 WHERE id = ?1 RETURNING *")
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Vendor", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_vendor_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vendors();

        let vendor = repo.insert("Acme", "acme@example.com").await.unwrap();
        assert!(vendor.is_active);
        assert_eq!(repo.get_by_email("ACME@EXAMPLE.COM").await.unwrap(), Some(vendor.clone()));

        let err = repo.insert("Acme 2", "acme@example.com").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let inactive = repo.set_active(&vendor.id, false).await.unwrap();
        assert!(!inactive.is_active);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
