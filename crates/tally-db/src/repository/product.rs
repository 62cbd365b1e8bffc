//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Tenant-scoped lookup and listing
//! - Inserts/updates (quantity changes only through `*_tx` methods)
//! - Transaction-scoped counter access for the mutation primitives
//!
//! ## Counter Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity is only ever written through set_quantity_tx,       │
//! │  called by a mutation primitive that has just re-read the counter      │
//! │  (quantity_tx) and run the invariant guard, all inside the same        │
//! │  transaction. No other code path assigns it.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Product;

/// All columns of the products table, in struct order.
const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, barcode, name, category, supplier_id, \
     price_cents, quantity, low_stock_threshold, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, scoped to a tenant.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found and owned by the tenant
    /// * `Ok(None)` - Missing or owned by another tenant (indistinguishable)
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND tenant_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, tenant_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1 AND tenant_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products for a tenant, sorted by name.
    pub async fn list_active(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE tenant_id = ?1 AND is_active = 1 ORDER BY name LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU or barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");
        let mut conn = self.pool.acquire().await?;
        Self::insert_tx(&mut conn, product).await
    }

    /// Inserts a product on an existing connection/transaction.
    ///
    /// Used by the bulk import primitive so every row of an import
    /// commits or rolls back together.
    pub async fn insert_tx(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, barcode, name, category, supplier_id,
                price_cents, quantity, low_stock_threshold, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.supplier_id)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Re-reads a product's on-hand quantity inside a transaction.
    ///
    /// This is the read the invariant guard runs against; calling it
    /// outside the mutating transaction would reintroduce the stale-read
    /// race the engine exists to prevent.
    pub async fn quantity_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<i64>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND tenant_id = ?2")
                .bind(id)
                .bind(tenant_id)
                .fetch_optional(conn)
                .await?;

        Ok(quantity)
    }

    /// Writes a guarded quantity inside a transaction.
    ///
    /// The value has already passed the invariant guard against the
    /// quantity read in this same transaction, so this is an absolute
    /// set, not a relative bump.
    pub async fn set_quantity_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET quantity = ?3, updated_at = ?4 \
             WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(quantity)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts how many of the given ids exist and belong to the tenant.
    ///
    /// Bulk operations compare this against the requested id count to
    /// reject the whole batch when any id is missing or cross-tenant.
    pub async fn count_owned(&self, tenant_id: &str, ids: &[String]) -> DbResult<i64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::new(
            "SELECT COUNT(*) FROM products WHERE tenant_id = ",
        );
        builder.push_bind(tenant_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(count)
    }

    /// Hard-deletes a product inside a transaction.
    ///
    /// Sales history is protected by the sale_items foreign key
    /// (RESTRICT), which surfaces as `DbError::ForeignKeyViolation`.
    pub async fn delete_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
