//! # Inter-Location Transfer
//!
//! Moves stock between two locations of the same tenant.
//!
//! ## Atomic Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One transaction, four effects, all-or-nothing:                        │
//! │                                                                         │
//! │    1. product_stock[source]      -= n   (strict guard, no transient    │
//! │                                          negatives)                    │
//! │    2. product_stock[destination] += n   (row created if absent)        │
//! │    3. movement  −n @ source      referencing the destination id       │
//! │    4. movement  +n @ destination referencing the source id            │
//! │                                                                         │
//! │  products.quantity is NOT touched: a transfer relocates stock,        │
//! │  it neither adds nor removes from the total.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::{guard, validation, CoreError, MovementType, ReferenceKind, ValidationError};
use tally_db::StockRepository;

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// Input for an inter-location transfer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    /// Units to move; strictly positive.
    pub quantity: i64,
}

/// Post-transfer per-location quantities.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub product_id: String,
    pub from_location_id: String,
    pub to_location_id: String,
    pub quantity: i64,
    pub from_quantity: i64,
    pub to_quantity: i64,
}

impl StockEngine {
    /// Transfers stock of a product from one location to another.
    pub async fn transfer_stock(&self, input: TransferInput) -> ActionResult<TransferOutcome> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.transfer_stock_inner(&user, &input).await {
            Ok(outcome) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "product",
                        entity_id: Some(outcome.product_id.clone()),
                        action: "stock.transfer",
                        changes: Some(serde_json::json!({
                            "from": outcome.from_location_id,
                            "to": outcome.to_location_id,
                            "quantity": outcome.quantity,
                        })),
                        note: None,
                    },
                );
                ActionResult::ok("Stock transferred", outcome)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn transfer_stock_inner(
        &self,
        user: &AuthedUser,
        input: &TransferInput,
    ) -> EngineResult<TransferOutcome> {
        validation::validate_uuid("product_id", &input.product_id)?;
        validation::validate_uuid("from_location_id", &input.from_location_id)?;
        validation::validate_uuid("to_location_id", &input.to_location_id)?;
        validation::validate_quantity("quantity", input.quantity)?;

        if input.from_location_id == input.to_location_id {
            return Err(ValidationError::InvalidFormat {
                field: "to_location_id".to_string(),
                reason: "must differ from the source location".to_string(),
            }
            .into());
        }

        // Every referenced entity must exist and belong to the tenant.
        self.db
            .products()
            .get(&user.tenant_id, &input.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &input.product_id))?;
        self.db
            .locations()
            .get(&user.tenant_id, &input.from_location_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Location", &input.from_location_id))?;
        self.db
            .locations()
            .get(&user.tenant_id, &input.to_location_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Location", &input.to_location_id))?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Strict guard against the source counter as of this transaction;
        // a missing row means zero on hand there.
        let available =
            StockRepository::location_quantity_tx(&mut tx, &input.product_id, &input.from_location_id)
                .await?
                .unwrap_or(0);
        guard::require_available("Stock at source location", available, input.quantity)?;

        let destination_before =
            StockRepository::location_quantity_tx(&mut tx, &input.product_id, &input.to_location_id)
                .await?
                .unwrap_or(0);

        StockRepository::upsert_location_delta_tx(
            &mut tx,
            &input.product_id,
            &input.from_location_id,
            -input.quantity,
            now,
        )
        .await?;
        StockRepository::upsert_location_delta_tx(
            &mut tx,
            &input.product_id,
            &input.to_location_id,
            input.quantity,
            now,
        )
        .await?;

        // Two ledger rows, each referencing the counterpart location so
        // the transfer is traceable from both ends.
        let mut out =
            Self::new_movement(user, &input.product_id, MovementType::Transfer, -input.quantity);
        out.location_id = Some(input.from_location_id.clone());
        out.reference = Some(input.to_location_id.clone());
        out.reference_kind = Some(ReferenceKind::Transfer);
        StockRepository::insert_movement_tx(&mut tx, &out).await?;

        let mut incoming =
            Self::new_movement(user, &input.product_id, MovementType::Transfer, input.quantity);
        incoming.location_id = Some(input.to_location_id.clone());
        incoming.reference = Some(input.from_location_id.clone());
        incoming.reference_kind = Some(ReferenceKind::Transfer);
        StockRepository::insert_movement_tx(&mut tx, &incoming).await?;

        tx.commit().await?;

        info!(
            product_id = %input.product_id,
            from = %input.from_location_id,
            to = %input.to_location_id,
            quantity = input.quantity,
            "Stock transferred"
        );

        Ok(TransferOutcome {
            product_id: input.product_id.clone(),
            from_location_id: input.from_location_id.clone(),
            to_location_id: input.to_location_id.clone(),
            quantity: input.quantity,
            from_quantity: available - input.quantity,
            to_quantity: destination_before + input.quantity,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_location, seed_product, test_engine, TENANT};

    async fn put_stock_at(engine: &StockEngine, product_id: &str, location_id: &str, qty: i64) {
        let mut tx = engine.db().begin().await.unwrap();
        StockRepository::upsert_location_delta_tx(&mut tx, product_id, location_id, qty, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn transfer_creates_destination_row_and_two_movements() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 5).await;
        let a = seed_location(engine.db(), "Warehouse A").await;
        let b = seed_location(engine.db(), "Warehouse B").await;
        put_stock_at(&engine, &product.id, &a.id, 5).await;

        let result = engine
            .transfer_stock(TransferInput {
                product_id: product.id.clone(),
                from_location_id: a.id.clone(),
                to_location_id: b.id.clone(),
                quantity: 5,
            })
            .await;

        assert!(result.success, "{}", result.message);
        let outcome = result.data.unwrap();
        assert_eq!(outcome.from_quantity, 0);
        assert_eq!(outcome.to_quantity, 5);

        let rows = engine.db().stock().stock_for_product(&product.id).await.unwrap();
        let at = |loc: &str| rows.iter().find(|r| r.location_id == loc).unwrap().quantity;
        assert_eq!(at(&a.id), 0);
        assert_eq!(at(&b.id), 5);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 2);
        let mut quantities: Vec<i64> = movements.iter().map(|m| m.quantity).collect();
        quantities.sort();
        assert_eq!(quantities, vec![-5, 5]);
        assert!(movements
            .iter()
            .all(|m| m.movement_type == MovementType::Transfer
                && m.reference_kind == Some(ReferenceKind::Transfer)));

        // Aggregate total is untouched by transfers.
        let stored = engine
            .db()
            .products()
            .get(TENANT, &product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity, 5);
    }

    #[tokio::test]
    async fn round_trip_restores_both_locations_and_nets_to_zero() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 9).await;
        let a = seed_location(engine.db(), "A").await;
        let b = seed_location(engine.db(), "B").await;
        put_stock_at(&engine, &product.id, &a.id, 9).await;

        for (from, to) in [(&a, &b), (&b, &a)] {
            let result = engine
                .transfer_stock(TransferInput {
                    product_id: product.id.clone(),
                    from_location_id: from.id.clone(),
                    to_location_id: to.id.clone(),
                    quantity: 4,
                })
                .await;
            assert!(result.success, "{}", result.message);
        }

        let rows = engine.db().stock().stock_for_product(&product.id).await.unwrap();
        let at = |loc: &str| rows.iter().find(|r| r.location_id == loc).unwrap().quantity;
        assert_eq!(at(&a.id), 9);
        assert_eq!(at(&b.id), 0);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 4);
        assert_eq!(movements.iter().map(|m| m.quantity).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn insufficient_stock_at_source_rejects_with_no_effects() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;
        let a = seed_location(engine.db(), "A").await;
        let b = seed_location(engine.db(), "B").await;
        put_stock_at(&engine, &product.id, &a.id, 2).await;

        let result = engine
            .transfer_stock(TransferInput {
                product_id: product.id.clone(),
                from_location_id: a.id.clone(),
                to_location_id: b.id.clone(),
                quantity: 3,
            })
            .await;

        assert!(!result.success);
        assert_eq!(
            result.message,
            "Insufficient stock for Stock at source location: short by 1"
        );

        let rows = engine.db().stock().stock_for_product(&product.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 2);
        assert!(engine
            .db()
            .stock()
            .movements_for_product(TENANT, &product.id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn transfer_from_location_with_no_stock_row_is_rejected() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;
        let a = seed_location(engine.db(), "A").await;
        let b = seed_location(engine.db(), "B").await;

        let result = engine
            .transfer_stock(TransferInput {
                product_id: product.id,
                from_location_id: a.id,
                to_location_id: b.id,
                quantity: 1,
            })
            .await;

        assert!(!result.success);
    }

    #[tokio::test]
    async fn same_source_and_destination_is_rejected() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 10).await;
        let a = seed_location(engine.db(), "A").await;

        let result = engine
            .transfer_stock(TransferInput {
                product_id: product.id,
                from_location_id: a.id.clone(),
                to_location_id: a.id,
                quantity: 1,
            })
            .await;

        assert!(!result.success);
        let errors = result.errors.unwrap();
        assert!(errors.contains_key("to_location_id"));
    }
}
