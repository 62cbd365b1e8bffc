//! # Batch Operations
//!
//! Create, adjust and delete product batches (lots). Batch quantity and
//! the parent product's aggregate quantity move together; every change
//! lands in the ledger with a batch reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::{guard, validation, Batch, CoreError, MovementType, ReferenceKind};
use tally_db::repository::batch::generate_batch_id;
use tally_db::{BatchRepository, ProductRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// Input for creating a batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewBatchInput {
    pub product_id: String,
    /// Lot identifier; unique per product.
    pub batch_number: String,
    /// Initial units in the lot; zero is allowed.
    pub quantity: i64,
    pub cost_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub manufactured_date: Option<DateTime<Utc>>,
    /// Purchase order this lot was received against, if any.
    pub purchase_order_id: Option<String>,
}

/// Input for a batch quantity adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchAdjustInput {
    pub batch_id: String,
    /// Signed change; negative removes stock.
    pub delta: i64,
    /// Optional reason, copied onto the ledger row.
    pub note: Option<String>,
}

impl StockEngine {
    /// Creates a batch; a nonzero initial quantity raises the parent
    /// product's total and writes an `in` movement.
    pub async fn create_batch(&self, input: NewBatchInput) -> ActionResult<Batch> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.create_batch_inner(&user, &input).await {
            Ok(batch) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "batch",
                        entity_id: Some(batch.id.clone()),
                        action: "batch.create",
                        changes: Some(serde_json::json!({
                            "batch_number": batch.batch_number,
                            "quantity": batch.quantity,
                        })),
                        note: None,
                    },
                );
                ActionResult::ok("Batch created", batch)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    /// Adjusts a batch's quantity; the parent product moves by the same
    /// delta.
    pub async fn adjust_batch(&self, input: BatchAdjustInput) -> ActionResult<Batch> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.adjust_batch_inner(&user, &input).await {
            Ok(batch) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "batch",
                        entity_id: Some(batch.id.clone()),
                        action: "batch.adjust",
                        changes: Some(serde_json::json!({
                            "delta": input.delta,
                            "quantity": batch.quantity,
                        })),
                        note: input.note.clone(),
                    },
                );
                ActionResult::ok("Batch adjusted", batch)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    /// Deletes a batch. Rejected unless its quantity is exactly zero;
    /// the batch's ledger rows are removed with it (the one permitted
    /// ledger deletion, and only because the rows net to nothing).
    pub async fn delete_batch(&self, batch_id: &str) -> ActionResult<()> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.delete_batch_inner(&user, batch_id).await {
            Ok(()) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "batch",
                        entity_id: Some(batch_id.to_string()),
                        action: "batch.delete",
                        changes: None,
                        note: None,
                    },
                );
                ActionResult::ok("Batch deleted", ())
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn create_batch_inner(
        &self,
        user: &AuthedUser,
        input: &NewBatchInput,
    ) -> EngineResult<Batch> {
        validation::validate_uuid("product_id", &input.product_id)?;
        validation::validate_name("batch_number", &input.batch_number)?;
        guard::require_non_negative("Batch", input.quantity)?;
        if let Some(cost) = input.cost_cents {
            validation::validate_price_cents("cost_cents", cost)?;
        }

        let product = self
            .db
            .products()
            .get(&user.tenant_id, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &input.product_id))?;

        // A linked order must exist and belong to the tenant; its number
        // becomes the ledger reference.
        let order_number = match &input.purchase_order_id {
            Some(order_id) => {
                let order = self
                    .db
                    .purchase_orders()
                    .get(&user.tenant_id, order_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Purchase order", order_id))?;
                Some(order.order_number)
            }
            None => None,
        };

        let now = Utc::now();
        let batch = Batch {
            id: generate_batch_id(),
            tenant_id: user.tenant_id.clone(),
            product_id: product.id.clone(),
            batch_number: input.batch_number.trim().to_string(),
            quantity: input.quantity,
            cost_cents: input.cost_cents,
            expiry_date: input.expiry_date,
            manufactured_date: input.manufactured_date,
            purchase_order_id: input.purchase_order_id.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        BatchRepository::insert_tx(&mut tx, &batch).await?;

        if input.quantity > 0 {
            let current = ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &product.id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &product.id))?;
            let next = guard::apply_delta("Product", current, input.quantity)?;
            ProductRepository::set_quantity_tx(&mut tx, &user.tenant_id, &product.id, next, now)
                .await?;

            let mut movement =
                Self::new_movement(user, &product.id, MovementType::In, input.quantity);
            movement.batch_id = Some(batch.id.clone());
            if order_number.is_some() {
                movement.reference = order_number.clone();
                movement.reference_kind = Some(ReferenceKind::PurchaseOrder);
            }
            StockRepository::insert_movement_tx(&mut tx, &movement).await?;
        }

        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            batch_number = %batch.batch_number,
            quantity = batch.quantity,
            "Batch created"
        );

        Ok(batch)
    }

    async fn adjust_batch_inner(
        &self,
        user: &AuthedUser,
        input: &BatchAdjustInput,
    ) -> EngineResult<Batch> {
        validation::validate_uuid("batch_id", &input.batch_id)?;
        validation::validate_delta("delta", input.delta)?;

        let batch = self
            .db
            .batches()
            .get(&user.tenant_id, &input.batch_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Batch", &input.batch_id))?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let batch_current = BatchRepository::quantity_tx(&mut tx, &user.tenant_id, &batch.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Batch", &batch.id))?;
        let batch_next = guard::apply_delta("Batch", batch_current, input.delta)?;

        let product_current =
            ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &batch.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &batch.product_id))?;
        let product_next = guard::apply_delta("Product", product_current, input.delta)?;

        BatchRepository::set_quantity_tx(&mut tx, &user.tenant_id, &batch.id, batch_next, now)
            .await?;
        ProductRepository::set_quantity_tx(
            &mut tx,
            &user.tenant_id,
            &batch.product_id,
            product_next,
            now,
        )
        .await?;

        let mut movement =
            Self::new_movement(user, &batch.product_id, MovementType::Adjustment, input.delta);
        movement.batch_id = Some(batch.id.clone());
        movement.note = input.note.clone();
        StockRepository::insert_movement_tx(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            batch_id = %batch.id,
            delta = input.delta,
            quantity = batch_next,
            "Batch adjusted"
        );

        Ok(Batch {
            quantity: batch_next,
            updated_at: now,
            ..batch
        })
    }

    async fn delete_batch_inner(&self, user: &AuthedUser, batch_id: &str) -> EngineResult<()> {
        validation::validate_uuid("batch_id", batch_id)?;

        let batch = self
            .db
            .batches()
            .get(&user.tenant_id, batch_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Batch", batch_id))?;

        let mut tx = self.db.begin().await?;

        let quantity = BatchRepository::quantity_tx(&mut tx, &user.tenant_id, &batch.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Batch", &batch.id))?;

        if quantity != 0 {
            return Err(CoreError::NotEmpty {
                entity: "Batch".to_string(),
                quantity,
            }
            .into());
        }

        BatchRepository::delete_tx(&mut tx, &user.tenant_id, &batch.id).await?;

        tx.commit().await?;

        info!(batch_id = %batch.id, "Batch deleted");

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_batch, seed_product, test_engine, TENANT};

    #[tokio::test]
    async fn create_batch_raises_product_total_and_writes_in_movement() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;

        let result = engine
            .create_batch(NewBatchInput {
                product_id: product.id.clone(),
                batch_number: "LOT-1".to_string(),
                quantity: 30,
                cost_cents: Some(120),
                expiry_date: None,
                manufactured_date: None,
                purchase_order_id: None,
            })
            .await;

        assert!(result.success, "{}", result.message);

        let stored = engine
            .db()
            .products()
            .get(TENANT, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 40);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::In);
        assert_eq!(movements[0].quantity, 30);
        assert!(movements[0].batch_id.is_some());
    }

    #[tokio::test]
    async fn duplicate_batch_number_for_same_product_is_rejected() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 0).await;
        seed_batch(engine.db(), &product.id, "LOT-1", 0).await;

        let result = engine
            .create_batch(NewBatchInput {
                product_id: product.id,
                batch_number: "LOT-1".to_string(),
                quantity: 5,
                cost_cents: None,
                expiry_date: None,
                manufactured_date: None,
                purchase_order_id: None,
            })
            .await;

        assert!(!result.success);
        assert!(result.message.contains("already exists"), "{}", result.message);
    }

    #[tokio::test]
    async fn batch_adjustment_moves_batch_and_product_together() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 20).await;
        let batch = seed_batch(engine.db(), &product.id, "LOT-1", 12).await;

        let result = engine
            .adjust_batch(BatchAdjustInput {
                batch_id: batch.id.clone(),
                delta: -5,
                note: Some("expired units".to_string()),
            })
            .await;

        assert!(result.success, "{}", result.message);
        assert_eq!(result.data.unwrap().quantity, 7);

        let stored_product = engine
            .db()
            .products()
            .get(TENANT, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_product.quantity, 15);

        let movements = engine
            .db()
            .stock()
            .movements_for_batch(TENANT, &batch.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, -5);
        assert_eq!(movements[0].note.as_deref(), Some("expired units"));
    }

    #[tokio::test]
    async fn batch_adjustment_below_zero_is_rejected() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 20).await;
        let batch = seed_batch(engine.db(), &product.id, "LOT-1", 3).await;

        let result = engine
            .adjust_batch(BatchAdjustInput {
                batch_id: batch.id.clone(),
                delta: -4,
                note: None,
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.message, "Insufficient stock for Batch: short by 1");

        let stored = engine
            .db()
            .batches()
            .get(TENANT, &batch.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 3);
    }

    #[tokio::test]
    async fn delete_rejected_while_batch_holds_stock() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 20).await;
        let batch = seed_batch(engine.db(), &product.id, "LOT-1", 2).await;

        let result = engine.delete_batch(&batch.id).await;

        assert!(!result.success);
        assert_eq!(
            result.message,
            "Cannot delete Batch with remaining stock (2 on hand)"
        );
        assert!(engine.db().batches().get(TENANT, &batch.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_of_empty_batch_succeeds_and_cascades_its_movements() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 20).await;
        let batch = seed_batch(engine.db(), &product.id, "LOT-1", 4).await;

        // Drain it through the engine so the ledger has batch-scoped rows.
        let drained = engine
            .adjust_batch(BatchAdjustInput {
                batch_id: batch.id.clone(),
                delta: -4,
                note: None,
            })
            .await;
        assert!(drained.success);

        let result = engine.delete_batch(&batch.id).await;
        assert!(result.success, "{}", result.message);

        assert!(engine.db().batches().get(TENANT, &batch.id).await.unwrap().is_none());
        assert!(engine
            .db()
            .stock()
            .movements_for_batch(TENANT, &batch.id)
            .await
            .unwrap()
            .is_empty());
    }
}
