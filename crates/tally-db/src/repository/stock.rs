//! # Stock Repository
//!
//! The stock ledger store: append-only movement rows plus the mutable
//! per-product-per-location counters.
//!
//! ## Ledger Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 stock_movements (append-only)                           │
//! │                                                                         │
//! │  INSERT ─ yes, one row per counter change, same transaction            │
//! │  UPDATE ─ never                                                         │
//! │  DELETE ─ never directly; only the batch cascade removes rows,        │
//! │           and only for a batch already at quantity zero               │
//! │                                                                         │
//! │  product_stock (mutable counters)                                      │
//! │                                                                         │
//! │  Rows are upserted lazily: the first transfer into a location          │
//! │  creates the (product, location) row, later transfers increment it.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{ProductStock, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, tenant_id, product_id, location_id, batch_id, movement_type, \
     quantity, reference, reference_kind, note, created_at";

/// Repository for stock movements and per-location stock counters.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Movements (the ledger)
    // -------------------------------------------------------------------------

    /// Appends a movement row inside a transaction.
    ///
    /// Every counter change in the engine pairs with exactly this call
    /// in the same transaction; there is no out-of-transaction insert.
    pub async fn insert_movement_tx(
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, product_id, location_id, batch_id,
                movement_type, quantity, reference, reference_kind, note,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.tenant_id)
        .bind(&movement.product_id)
        .bind(&movement.location_id)
        .bind(&movement.batch_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(&movement.reference)
        .bind(movement.reference_kind)
        .bind(&movement.note)
        .bind(movement.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Lists a product's movements, most recent first.
    pub async fn movements_for_product(
        &self,
        tenant_id: &str,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND product_id = ?2 \
             ORDER BY created_at DESC, id DESC LIMIT ?3"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists the movements attached to a batch.
    pub async fn movements_for_batch(
        &self,
        tenant_id: &str,
        batch_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE tenant_id = ?1 AND batch_id = ?2 ORDER BY created_at"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(tenant_id)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Net sum of all movement deltas for a product.
    ///
    /// Diagnostic query: replaying the ledger from zero should, in
    /// principle, reproduce the cached counter.
    pub async fn net_movement_total(&self, tenant_id: &str, product_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM stock_movements \
             WHERE tenant_id = ?1 AND product_id = ?2",
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    // -------------------------------------------------------------------------
    // Per-location counters
    // -------------------------------------------------------------------------

    /// Re-reads a location's quantity for a product inside a transaction.
    ///
    /// `None` means no row exists yet (distinct from an explicit zero).
    pub async fn location_quantity_tx(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
    ) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM product_stock \
             WHERE product_id = ?1 AND location_id = ?2",
        )
        .bind(product_id)
        .bind(location_id)
        .fetch_optional(conn)
        .await?;

        Ok(quantity)
    }

    /// Applies a guarded delta to a location counter, creating the row
    /// if absent (create-if-absent, else increment).
    ///
    /// The caller has already guarded the result against the quantity
    /// read in this same transaction.
    pub async fn upsert_location_delta_tx(
        conn: &mut SqliteConnection,
        product_id: &str,
        location_id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, location_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (product_id, location_id)
            DO UPDATE SET quantity = quantity + excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(product_id)
        .bind(location_id)
        .bind(delta)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Lists per-location stock rows for a product.
    pub async fn stock_for_product(&self, product_id: &str) -> DbResult<Vec<ProductStock>> {
        let rows = sqlx::query_as::<_, ProductStock>(
            "SELECT product_id, location_id, quantity, updated_at \
             FROM product_stock WHERE product_id = ?1 ORDER BY location_id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Total located units sitting at a location, across all products.
    ///
    /// The location-deletion guard rejects while this is non-zero.
    pub async fn located_total_tx(
        conn: &mut SqliteConnection,
        location_id: &str,
    ) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM product_stock WHERE location_id = ?1",
        )
        .bind(location_id)
        .fetch_one(conn)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Sum of located stock for one product (diagnostics; may diverge
    /// from the product's aggregate quantity, see ProductStock docs).
    pub async fn located_total_for_product(&self, product_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity) FROM product_stock WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}

/// Generates a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}
