//! # Reorder Rule Repository
//!
//! Read-mostly access to per-product reorder configuration. The
//! suggestion engine consumes these rows; nothing here mutates stock.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{Product, ReorderRule};

const RULE_COLUMNS: &str = "id, tenant_id, product_id, reorder_point, reorder_quantity, \
     preferred_supplier_id, is_active, created_at, updated_at";

/// Repository for reorder rule database operations.
#[derive(Debug, Clone)]
pub struct ReorderRuleRepository {
    pool: SqlitePool,
}

impl ReorderRuleRepository {
    /// Creates a new ReorderRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReorderRuleRepository { pool }
    }

    /// Lists a tenant's active rules.
    pub async fn active_rules(&self, tenant_id: &str) -> DbResult<Vec<ReorderRule>> {
        let sql = format!(
            "SELECT {RULE_COLUMNS} FROM reorder_rules \
             WHERE tenant_id = ?1 AND is_active = 1"
        );
        let rules = sqlx::query_as::<_, ReorderRule>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rules)
    }

    /// Inserts a rule.
    pub async fn insert(&self, rule: &ReorderRule) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reorder_rules (
                id, tenant_id, product_id, reorder_point, reorder_quantity,
                preferred_supplier_id, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.tenant_id)
        .bind(&rule.product_id)
        .bind(rule.reorder_point)
        .bind(rule.reorder_quantity)
        .bind(&rule.preferred_supplier_id)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Active products that have a low-stock threshold but no active
    /// reorder rule. These get the default suggested-quantity heuristic.
    pub async fn products_with_threshold_without_rule(
        &self,
        tenant_id: &str,
    ) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.tenant_id, p.sku, p.barcode, p.name, p.category,
                   p.supplier_id, p.price_cents, p.quantity,
                   p.low_stock_threshold, p.is_active, p.created_at, p.updated_at
            FROM products p
            WHERE p.tenant_id = ?1
              AND p.is_active = 1
              AND p.low_stock_threshold IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM reorder_rules r
                  WHERE r.product_id = p.id AND r.is_active = 1
              )
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

/// Generates a new reorder rule ID.
pub fn generate_rule_id() -> String {
    Uuid::new_v4().to_string()
}
