//! # Location & Supplier Repositories
//!
//! Reference-entity access. CRUD for these lives upstream; the engine
//! needs lookups for tenant-scope checks, plus the guarded location
//! delete.

use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{Location, Supplier};

// =============================================================================
// Locations
// =============================================================================

/// Repository for location database operations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Gets a location by ID, scoped to a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, tenant_id, name, created_at FROM locations \
             WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Lists a tenant's locations.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, tenant_id, name, created_at FROM locations \
             WHERE tenant_id = ?1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Inserts a location.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already used in tenant
    pub async fn insert(&self, location: &Location) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO locations (id, tenant_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&location.id)
        .bind(&location.tenant_id)
        .bind(&location.name)
        .bind(location.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a location inside a transaction.
    ///
    /// The engine has already verified no located stock remains;
    /// zero-quantity product_stock rows go with it via the cascade.
    pub async fn delete_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }

        Ok(())
    }
}

// =============================================================================
// Suppliers
// =============================================================================

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Gets a supplier by ID, scoped to a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, tenant_id, name, created_at FROM suppliers \
             WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Inserts a supplier.
    pub async fn insert(&self, supplier: &Supplier) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO suppliers (id, tenant_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&supplier.id)
        .bind(&supplier.tenant_id)
        .bind(&supplier.name)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Generates a new location ID.
pub fn generate_location_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new supplier ID.
pub fn generate_supplier_id() -> String {
    Uuid::new_v4().to_string()
}
