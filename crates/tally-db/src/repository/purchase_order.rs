//! # Purchase Order Repository
//!
//! Database operations for purchase orders and their lines.
//!
//! ## Receiving Flow (engine-side, repeated here for orientation)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    get_tx(order)          ← status + tenant check                      │
//! │    items_tx(order)        ← re-read received counters                  │
//! │    per line: over-receive guard, add_received_tx, product counter,     │
//! │              movement append                                            │
//! │    derive status → update_status_tx (same transaction)                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus};

const ORDER_COLUMNS: &str = "id, tenant_id, supplier_id, order_number, status, notes, \
     ordered_at, received_at, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, purchase_order_id, product_id, name, ordered_quantity, received_quantity, unit_cost_cents";

/// Repository for purchase order database operations.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    /// Creates a new PurchaseOrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Gets an order by ID, scoped to a tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ?1 AND tenant_id = ?2"
        );
        let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Re-reads an order inside a transaction.
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<PurchaseOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ?1 AND tenant_id = ?2"
        );
        let order = sqlx::query_as::<_, PurchaseOrder>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(conn)
            .await?;

        Ok(order)
    }

    /// Lists an order's lines.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<PurchaseOrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_order_items \
             WHERE purchase_order_id = ?1 ORDER BY name"
        );
        let items = sqlx::query_as::<_, PurchaseOrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Re-reads an order's lines inside a transaction.
    ///
    /// The over-receive guard runs against these counters, not against
    /// whatever the caller read before the transaction opened.
    pub async fn items_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<PurchaseOrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_order_items \
             WHERE purchase_order_id = ?1 ORDER BY name"
        );
        let items = sqlx::query_as::<_, PurchaseOrderItem>(&sql)
            .bind(order_id)
            .fetch_all(conn)
            .await?;

        Ok(items)
    }

    /// Inserts an order and its lines.
    ///
    /// Used by the upstream CRUD layer and by tests to seed orders.
    pub async fn insert(
        &self,
        order: &PurchaseOrder,
        items: &[PurchaseOrderItem],
    ) -> DbResult<()> {
        debug!(order_number = %order.order_number, lines = items.len(), "Inserting purchase order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, tenant_id, supplier_id, order_number, status, notes,
                ordered_at, received_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.supplier_id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.ordered_at)
        .bind(order.received_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, product_id, name,
                    ordered_quantity, received_quantity, unit_cost_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_order_id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.ordered_quantity)
            .bind(item.received_quantity)
            .bind(item.unit_cost_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Increments a line's received quantity inside a transaction.
    ///
    /// The engine has already guarded against over-receiving using the
    /// counters re-read in this same transaction.
    pub async fn add_received_tx(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE purchase_order_items \
             SET received_quantity = received_quantity + ?2 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(quantity)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase order item", item_id));
        }

        Ok(())
    }

    /// Persists a status produced by the state machine, stamping
    /// ordered/received dates on the corresponding entries.
    pub async fn update_status_tx(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
        status: PurchaseOrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let stamp_ordered = status == PurchaseOrderStatus::Ordered;
        let stamp_received = status == PurchaseOrderStatus::Received;

        let result = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                status = ?3,
                ordered_at = CASE WHEN ?4 THEN ?6 ELSE ordered_at END,
                received_at = CASE WHEN ?5 THEN ?6 ELSE received_at END,
                updated_at = ?6
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .bind(stamp_ordered)
        .bind(stamp_received)
        .bind(now)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase order", id));
        }

        Ok(())
    }
}

/// Generates a new purchase order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new purchase order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}
