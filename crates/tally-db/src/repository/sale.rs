//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! Sales are written only by the checkout/void primitives; the rows and
//! the stock decrements commit in the same transaction. The aggregate
//! queries at the bottom feed the demand forecast engine.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{Sale, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = "id, tenant_id, receipt_number, status, subtotal_cents, total_cents, \
     user_id, notes, created_at, completed_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, \
     line_total_cents, created_at";

/// Aggregated completed-sale quantities for one product over a lookback
/// window, split into window halves for trend classification.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalesAggregate {
    pub product_id: String,
    /// Total units sold in the window.
    pub total_quantity: i64,
    /// Units sold in the second (more recent) half of the window.
    pub second_half_quantity: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID, scoped to a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Re-reads a sale inside a transaction (void primitive).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1 AND tenant_id = ?2");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(conn)
            .await?;

        Ok(sale)
    }

    /// Inserts a sale row inside a transaction.
    pub async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, receipt_number, status, subtotal_cents,
                total_cents, user_id, notes, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.receipt_number)
        .bind(sale.status)
        .bind(sale.subtotal_cents)
        .bind(sale.total_cents)
        .bind(&sale.user_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.completed_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a sale line inside a transaction.
    ///
    /// ## Snapshot Pattern
    /// Product name and price are copied onto the line, so the sale
    /// history survives later product edits.
    pub async fn insert_item_tx(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, name_snapshot, quantity,
                unit_price_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets all items for a sale.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Re-reads a sale's items inside a transaction (void primitive).
    pub async fn items_tx(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(conn)
            .await?;

        Ok(items)
    }

    /// Updates a sale's status inside a transaction (checkout never
    /// updates; only the void primitive moves completed → voided).
    pub async fn set_status_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        status: SaleStatus,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE sales SET status = ?3 WHERE id = ?1 AND tenant_id = ?2")
                .bind(id)
                .bind(tenant_id)
                .bind(status)
                .execute(conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Forecast aggregates (read-only)
    // -------------------------------------------------------------------------

    /// Aggregates completed-sale line quantities per product over the
    /// window `[start, now]`, with a second bucket for lines at or after
    /// `midpoint`. Voided sales are excluded.
    pub async fn sales_aggregates(
        &self,
        tenant_id: &str,
        start: DateTime<Utc>,
        midpoint: DateTime<Utc>,
    ) -> DbResult<Vec<SalesAggregate>> {
        let aggregates = sqlx::query_as::<_, SalesAggregate>(
            r#"
            SELECT
                si.product_id AS product_id,
                SUM(si.quantity) AS total_quantity,
                SUM(CASE WHEN s.completed_at >= ?3 THEN si.quantity ELSE 0 END)
                    AS second_half_quantity
            FROM sale_items si
            INNER JOIN sales s ON s.id = si.sale_id
            WHERE s.tenant_id = ?1
              AND s.status = 'completed'
              AND s.completed_at >= ?2
            GROUP BY si.product_id
            "#,
        )
        .bind(tenant_id)
        .bind(start)
        .bind(midpoint)
        .fetch_all(&self.pool)
        .await?;

        Ok(aggregates)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a receipt number in format: YYYYMMDD-XXXXXXXX
///
/// ## Format
/// - YYYYMMDD: Date
/// - XXXXXXXX: First 8 hex chars of a fresh UUID (collision-safe enough
///   per tenant per day; the unique index is the real arbiter)
pub fn generate_receipt_number() -> String {
    let now = Utc::now();
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{}-{}", now.format("%Y%m%d"), suffix)
}
