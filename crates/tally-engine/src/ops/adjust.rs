//! # Direct Stock Adjustment
//!
//! Single-product signed delta: new quantity = current + delta, rejected
//! if the result would be negative. Writes one `adjustment` ledger row
//! in the same transaction as the counter update.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::{guard, validation, CoreError, MovementType, Product};
use tally_db::{ProductRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// Input for a direct stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockInput {
    pub product_id: String,
    /// Signed change; negative removes stock.
    pub delta: i64,
    /// Optional operator note, copied onto the ledger row.
    pub note: Option<String>,
}

impl StockEngine {
    /// Adjusts a product's on-hand quantity by a signed delta.
    pub async fn adjust_stock(&self, input: AdjustStockInput) -> ActionResult<Product> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.adjust_stock_inner(&user, &input).await {
            Ok(product) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "product",
                        entity_id: Some(product.id.clone()),
                        action: "stock.adjust",
                        changes: Some(serde_json::json!({
                            "delta": input.delta,
                            "quantity": product.quantity,
                        })),
                        note: input.note.clone(),
                    },
                );
                ActionResult::ok("Stock adjusted", product)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn adjust_stock_inner(
        &self,
        user: &AuthedUser,
        input: &AdjustStockInput,
    ) -> EngineResult<Product> {
        validation::validate_uuid("product_id", &input.product_id)?;
        validation::validate_delta("delta", input.delta)?;

        let product = self
            .db
            .products()
            .get(&user.tenant_id, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &input.product_id))?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Guard against the quantity as of THIS transaction, not the
        // row fetched above.
        let current = ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &product.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &product.id))?;
        let next = guard::apply_delta("Product", current, input.delta)?;

        ProductRepository::set_quantity_tx(&mut tx, &user.tenant_id, &product.id, next, now)
            .await?;

        let mut movement =
            Self::new_movement(user, &product.id, MovementType::Adjustment, input.delta);
        movement.note = input.note.clone();
        StockRepository::insert_movement_tx(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            product_id = %product.id,
            delta = input.delta,
            quantity = next,
            "Stock adjusted"
        );

        Ok(Product {
            quantity: next,
            updated_at: now,
            ..product
        })
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
    async fn adjustment_applies_delta_and_writes_ledger_row() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;

        let result = engine
            .adjust_stock(AdjustStockInput {
                product_id: product.id.clone(),
                delta: -4,
                note: Some("damaged in transit".to_string()),
            })
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.data.unwrap().quantity, 6);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Adjustment);
        assert_eq!(movements[0].quantity, -4);
        assert_eq!(movements[0].note.as_deref(), Some("damaged in transit"));
    }

    #[tokio::test]
    async fn adjustment_rejected_when_result_would_be_negative() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;

        let result = engine
            .adjust_stock(AdjustStockInput {
                product_id: product.id.clone(),
                delta: -15,
                note: None,
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.message, "Insufficient stock for Product: short by 5");

        // Quantity unchanged, no ledger row written.
        let stored = engine
            .db()
            .products()
            .get(TENANT, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 10);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap();
        assert!(movements.is_empty());
    }

    #[tokio::test]
    async fn adjustment_to_exactly_zero_is_allowed() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;

        let result = engine
            .adjust_stock(AdjustStockInput {
                product_id: product.id.clone(),
                delta: -10,
                note: None,
            })
            .await;

        assert!(result.success);
        assert_eq!(result.data.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn zero_delta_is_a_field_scoped_validation_failure() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;

        let result = engine
            .adjust_stock(AdjustStockInput {
                product_id: product.id,
                delta: 0,
                note: None,
            })
            .await;

        assert!(!result.success);
        let errors = result.errors.unwrap();
        assert!(errors.contains_key("delta"));
    }

    #[tokio::test]
    async fn cross_tenant_product_reports_not_found() {
        let (engine, _audit) = test_engine().await;
        let foreign = seed_product_for(engine.db(), OTHER_TENANT, "SKU-X", 10, None).await;

        let result = engine
            .adjust_stock(AdjustStockInput {
                product_id: foreign.id.clone(),
                delta: -1,
                note: None,
            })
            .await;

        assert!(!result.success);
        assert!(result.message.contains("not found"));

        // The other tenant's stock is untouched.
        let stored = engine
            .db()
            .products()
            .get(OTHER_TENANT, &foreign.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 10);
    }
}
