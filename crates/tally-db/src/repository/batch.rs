//! # Batch Repository
//!
//! Database operations for product batches (lots).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Batch;

const BATCH_COLUMNS: &str = "id, tenant_id, product_id, batch_number, quantity, cost_cents, \
     expiry_date, manufactured_date, purchase_order_id, created_at, updated_at";

/// Repository for batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by ID, scoped to a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Batch>> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1 AND tenant_id = ?2");
        let batch = sqlx::query_as::<_, Batch>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(batch)
    }

    /// Lists a product's batches, oldest expiry first.
    pub async fn list_for_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE tenant_id = ?1 AND product_id = ?2 \
             ORDER BY expiry_date IS NULL, expiry_date"
        );
        let batches = sqlx::query_as::<_, Batch>(&sql)
            .bind(tenant_id)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(batches)
    }

    /// Inserts a batch inside a transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - batch number already used for
    ///   this product
    pub async fn insert_tx(conn: &mut SqliteConnection, batch: &Batch) -> DbResult<()> {
        debug!(batch_number = %batch.batch_number, product_id = %batch.product_id, "Inserting batch");

        sqlx::query(
            r#"
            INSERT INTO batches (
                id, tenant_id, product_id, batch_number, quantity, cost_cents,
                expiry_date, manufactured_date, purchase_order_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.tenant_id)
        .bind(&batch.product_id)
        .bind(&batch.batch_number)
        .bind(batch.quantity)
        .bind(batch.cost_cents)
        .bind(batch.expiry_date)
        .bind(batch.manufactured_date)
        .bind(&batch.purchase_order_id)
        .bind(batch.created_at)
        .bind(batch.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Re-reads a batch's quantity inside a transaction (the read the
    /// invariant guard runs against).
    pub async fn quantity_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<i64>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM batches WHERE id = ?1 AND tenant_id = ?2")
                .bind(id)
                .bind(tenant_id)
                .fetch_optional(conn)
                .await?;

        Ok(quantity)
    }

    /// Writes a guarded batch quantity inside a transaction.
    pub async fn set_quantity_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE batches SET quantity = ?3, updated_at = ?4 \
             WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(quantity)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        Ok(())
    }

    /// Deletes a batch inside a transaction.
    ///
    /// The engine has already verified quantity = 0; the batch's
    /// movement rows go with it via the cascade.
    pub async fn delete_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM batches WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", id));
        }

        Ok(())
    }
}

/// Generates a new batch ID.
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}
