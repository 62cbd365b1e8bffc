//! # Bulk Operations
//!
//! Adjust many products, delete many products, import many products.
//!
//! ## All-or-Nothing Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Ownership pre-check: every referenced id must exist and belong     │
//! │     to the tenant BEFORE anything is mutated.                          │
//! │  2. For bulk adjust: every delta is validated against the              │
//! │     transactional quantity (cumulatively per product) before any       │
//! │     counter is written. One bad line aborts the whole batch.           │
//! │  3. Everything runs in one transaction either way, so a failure        │
//! │     mid-apply can never leave partial writes behind.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::{guard, validation, CoreError, MovementType, Product};
use tally_db::repository::product::generate_product_id;
use tally_db::{ProductRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// One line of a bulk adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkAdjustLine {
    pub product_id: String,
    pub delta: i64,
}

/// One row of a product import.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ImportProductRow {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    /// Initial on-hand quantity; non-negative.
    pub quantity: i64,
    pub low_stock_threshold: Option<i64>,
}

impl StockEngine {
    /// Adjusts many products at once. If any line would drive its
    /// product negative, none of the lines are applied.
    pub async fn bulk_adjust(&self, lines: Vec<BulkAdjustLine>) -> ActionResult<u32> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.bulk_adjust_inner(&user, &lines).await {
            Ok(count) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "product",
                        entity_id: None,
                        action: "stock.bulk_adjust",
                        changes: Some(serde_json::json!({ "lines": count })),
                        note: None,
                    },
                );
                ActionResult::ok(format!("Adjusted {count} products"), count)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    /// Deletes many products. Ownership is checked for every id before
    /// any deletion; referential constraints (sales history) abort the
    /// whole batch.
    pub async fn bulk_delete_products(&self, product_ids: Vec<String>) -> ActionResult<u32> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.bulk_delete_inner(&user, &product_ids).await {
            Ok(count) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "product",
                        entity_id: None,
                        action: "product.bulk_delete",
                        changes: Some(serde_json::json!({ "deleted": count })),
                        note: None,
                    },
                );
                ActionResult::ok(format!("Deleted {count} products"), count)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    /// Imports a list of new products. Any invalid or duplicate row
    /// aborts the whole import.
    pub async fn import_products(&self, rows: Vec<ImportProductRow>) -> ActionResult<u32> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.import_inner(&user, &rows).await {
            Ok(count) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "product",
                        entity_id: None,
                        action: "product.import",
                        changes: Some(serde_json::json!({ "imported": count })),
                        note: None,
                    },
                );
                ActionResult::ok(format!("Imported {count} products"), count)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn bulk_adjust_inner(
        &self,
        user: &AuthedUser,
        lines: &[BulkAdjustLine],
    ) -> EngineResult<u32> {
        validation::validate_bulk_size("lines", lines.len())?;
        for line in lines {
            validation::validate_uuid("product_id", &line.product_id)?;
            validation::validate_delta("delta", line.delta)?;
        }

        // All-or-nothing ownership check before touching anything.
        let products = self.load_owned_products(user, lines.iter().map(|l| &l.product_id)).await?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Phase 1: validate every line against the transactional
        // quantity, running per-product totals so repeated lines are
        // guarded cumulatively. No writes yet.
        let mut running: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            let product = &products[&line.product_id];
            let current = match running.get(line.product_id.as_str()) {
                Some(q) => *q,
                None => {
                    ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &line.product_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?
                }
            };
            let next = guard::apply_delta(&product.sku, current, line.delta)?;
            running.insert(line.product_id.as_str(), next);
        }

        // Phase 2: every line validated; apply counters and ledger rows.
        for (product_id, quantity) in &running {
            ProductRepository::set_quantity_tx(&mut tx, &user.tenant_id, product_id, *quantity, now)
                .await?;
        }
        for line in lines {
            let mut movement = Self::new_movement(
                user,
                &line.product_id,
                MovementType::Adjustment,
                line.delta,
            );
            movement.note = Some("Bulk adjustment".to_string());
            StockRepository::insert_movement_tx(&mut tx, &movement).await?;
        }

        tx.commit().await?;

        info!(lines = lines.len(), "Bulk adjustment applied");

        Ok(lines.len() as u32)
    }

    async fn bulk_delete_inner(
        &self,
        user: &AuthedUser,
        product_ids: &[String],
    ) -> EngineResult<u32> {
        validation::validate_bulk_size("product_ids", product_ids.len())?;
        for id in product_ids {
            validation::validate_uuid("product_ids", id)?;
        }

        let products = self.load_owned_products(user, product_ids.iter()).await?;

        let mut tx = self.db.begin().await?;

        for id in products.keys() {
            ProductRepository::delete_tx(&mut tx, &user.tenant_id, id).await?;
        }

        tx.commit().await?;

        let count = products.len() as u32;
        info!(deleted = count, "Bulk delete applied");

        Ok(count)
    }

    async fn import_inner(&self, user: &AuthedUser, rows: &[ImportProductRow]) -> EngineResult<u32> {
        validation::validate_bulk_size("rows", rows.len())?;

        let mut seen_skus: HashSet<&str> = HashSet::new();
        for row in rows {
            validation::validate_sku(&row.sku)?;
            validation::validate_name("name", &row.name)?;
            validation::validate_price_cents("price_cents", row.price_cents)?;
            guard::require_non_negative("Product", row.quantity)?;

            if !seen_skus.insert(row.sku.trim()) {
                return Err(CoreError::duplicate("sku", row.sku.trim()).into());
            }
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        for row in rows {
            let product = Product {
                id: generate_product_id(),
                tenant_id: user.tenant_id.clone(),
                sku: row.sku.trim().to_string(),
                barcode: row.barcode.clone(),
                name: row.name.trim().to_string(),
                category: row.category.clone(),
                supplier_id: None,
                price_cents: row.price_cents,
                quantity: row.quantity,
                low_stock_threshold: row.low_stock_threshold,
                is_active: true,
                created_at: now,
                updated_at: now,
            };

            // The unique index backstops SKUs that already exist in the
            // tenant; the violation aborts the whole import.
            ProductRepository::insert_tx(&mut tx, &product).await?;

            if row.quantity > 0 {
                let mut movement =
                    Self::new_movement(user, &product.id, MovementType::In, row.quantity);
                movement.note = Some("Product import".to_string());
                StockRepository::insert_movement_tx(&mut tx, &movement).await?;
            }
        }

        tx.commit().await?;

        let count = rows.len() as u32;
        info!(imported = count, "Product import applied");

        Ok(count)
    }

    /// Loads every referenced product, failing on the first id that is
    /// missing or owned by another tenant. Returns a map by id.
    async fn load_owned_products<'a>(
        &self,
        user: &AuthedUser,
        ids: impl Iterator<Item = &'a String>,
    ) -> EngineResult<HashMap<String, Product>> {
        let mut products = HashMap::new();
        for id in ids {
            if products.contains_key(id) {
                continue;
            }
            let product = self
                .db
                .products()
                .get(&user.tenant_id, id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", id))?;
            products.insert(id.clone(), product);
        }
        Ok(products)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_product, seed_product_for, test_engine, OTHER_TENANT, TENANT};

    #[tokio::test]
    async fn bulk_adjust_applies_every_line() {
        let (engine, _audit) = test_engine().await;
        let a = seed_product(engine.db(), "SKU-A", 10).await;
        let b = seed_product(engine.db(), "SKU-B", 20).await;

        let result = engine
            .bulk_adjust(vec![
                BulkAdjustLine {
                    product_id: a.id.clone(),
                    delta: -3,
                },
                BulkAdjustLine {
                    product_id: b.id.clone(),
                    delta: 7,
                },
            ])
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.data, Some(2));

        let qty = |id: &str| {
            let engine = engine.clone();
            let id = id.to_string();
            async move {
                engine
                    .db()
                    .products()
                    .get(TENANT, &id)
                    .await
                    .unwrap()
                    .unwrap()
                    .quantity
            }
        };
        assert_eq!(qty(&a.id).await, 7);
        assert_eq!(qty(&b.id).await, 27);
    }

    #[tokio::test]
    async fn one_bad_line_aborts_every_line() {
        let (engine, _audit) = test_engine().await;
        let a = seed_product(engine.db(), "SKU-A", 10).await;
        let b = seed_product(engine.db(), "SKU-B", 2).await;

        let result = engine
            .bulk_adjust(vec![
                BulkAdjustLine {
                    product_id: a.id.clone(),
                    delta: -3,
                },
                BulkAdjustLine {
                    product_id: b.id.clone(),
                    delta: -5, // would go negative
                },
            ])
            .await;

        assert!(!result.success);
        assert_eq!(result.message, "Insufficient stock for SKU-B: short by 3");

        // Nothing applied, no ledger rows at all.
        for (id, expected) in [(&a.id, 10), (&b.id, 2)] {
            let stored = engine.db().products().get(TENANT, id).await.unwrap().unwrap();
            assert_eq!(stored.quantity, expected);
            assert!(engine
                .db()
                .stock()
                .movements_for_product(TENANT, id, 10)
                .await
                .unwrap()
                .is_empty());
        }
    }

    #[tokio::test]
    async fn cross_tenant_id_rejects_whole_batch_before_mutating() {
        let (engine, _audit) = test_engine().await;
        let mine = seed_product(engine.db(), "SKU-A", 10).await;
        let foreign = seed_product_for(engine.db(), OTHER_TENANT, "SKU-X", 5, None).await;

        let result = engine
            .bulk_adjust(vec![
                BulkAdjustLine {
                    product_id: mine.id.clone(),
                    delta: -1,
                },
                BulkAdjustLine {
                    product_id: foreign.id.clone(),
                    delta: -1,
                },
            ])
            .await;

        assert!(!result.success);
        assert!(result.message.contains("not found"));

        let stored = engine.db().products().get(TENANT, &mine.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
    }

    #[tokio::test]
    async fn bulk_delete_removes_owned_products() {
        let (engine, _audit) = test_engine().await;
        let a = seed_product(engine.db(), "SKU-A", 0).await;
        let b = seed_product(engine.db(), "SKU-B", 0).await;

        let result = engine
            .bulk_delete_products(vec![a.id.clone(), b.id.clone()])
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.data, Some(2));
        assert!(engine.db().products().get(TENANT, &a.id).await.unwrap().is_none());
        assert!(engine.db().products().get(TENANT, &b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn import_creates_products_and_opening_stock_movements() {
        let (engine, _audit) = test_engine().await;

        let result = engine
            .import_products(vec![
                ImportProductRow {
                    sku: "NEW-1".to_string(),
                    barcode: None,
                    name: "Imported One".to_string(),
                    category: Some("Pantry".to_string()),
                    price_cents: 999,
                    quantity: 12,
                    low_stock_threshold: Some(3),
                },
                ImportProductRow {
                    sku: "NEW-2".to_string(),
                    barcode: None,
                    name: "Imported Two".to_string(),
                    category: None,
                    price_cents: 250,
                    quantity: 0,
                    low_stock_threshold: None,
                },
            ])
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.data, Some(2));

        let one = engine
            .db()
            .products()
            .get_by_sku(TENANT, "NEW-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(one.quantity, 12);

        // Opening stock is in the ledger; the zero-quantity row wrote none.
        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &one.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);

        let two = engine
            .db()
            .products()
            .get_by_sku(TENANT, "NEW-2")
            .await
            .unwrap()
            .unwrap();
        assert!(engine
            .db()
            .stock()
            .movements_for_product(TENANT, &two.id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn import_with_duplicate_sku_in_rows_is_rejected() {
        let (engine, _audit) = test_engine().await;

        let result = engine
            .import_products(vec![
                ImportProductRow {
                    sku: "DUP".to_string(),
                    barcode: None,
                    name: "One".to_string(),
                    category: None,
                    price_cents: 100,
                    quantity: 1,
                    low_stock_threshold: None,
                },
                ImportProductRow {
                    sku: "DUP".to_string(),
                    barcode: None,
                    name: "Two".to_string(),
                    category: None,
                    price_cents: 100,
                    quantity: 1,
                    low_stock_threshold: None,
                },
            ])
            .await;

        assert!(!result.success);
        assert!(result.message.contains("already exists"));
        assert!(engine.db().products().get_by_sku(TENANT, "DUP").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn import_colliding_with_existing_sku_is_rejected_entirely() {
        let (engine, _audit) = test_engine().await;
        seed_product(engine.db(), "TAKEN", 5).await;

        let result = engine
            .import_products(vec![
                ImportProductRow {
                    sku: "FRESH".to_string(),
                    barcode: None,
                    name: "Fresh".to_string(),
                    category: None,
                    price_cents: 100,
                    quantity: 1,
                    low_stock_threshold: None,
                },
                ImportProductRow {
                    sku: "TAKEN".to_string(),
                    barcode: None,
                    name: "Taken".to_string(),
                    category: None,
                    price_cents: 100,
                    quantity: 1,
                    low_stock_threshold: None,
                },
            ])
            .await;

        assert!(!result.success);
        // The valid row rolled back with the bad one.
        assert!(engine.db().products().get_by_sku(TENANT, "FRESH").await.unwrap().is_none());
    }
}
