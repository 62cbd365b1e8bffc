//! # Sale Checkout & Void
//!
//! Checkout is the stock-mutating half of a sale: the sale row, its
//! line-item snapshots, the product decrements and the `out` ledger
//! rows commit as one unit. Voiding reverses the stock by appending
//! `in` rows; the original ledger entries are never touched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::{
    guard, validation, CoreError, MovementType, ReferenceKind, Sale, SaleItem, SaleStatus,
};
use tally_db::repository::sale::{generate_receipt_number, generate_sale_id, generate_sale_item_id};
use tally_db::{ProductRepository, SaleRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// One cart line at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub product_id: String,
    /// Units sold; strictly positive.
    pub quantity: i64,
}

impl StockEngine {
    /// Completes a sale: snapshots the lines, decrements each product
    /// under the invariant guard, writes one `out` movement per line.
    pub async fn checkout_sale(
        &self,
        lines: Vec<CheckoutLine>,
        note: Option<String>,
    ) -> ActionResult<Sale> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.checkout_inner(&user, &lines, note.clone()).await {
            Ok(sale) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "sale",
                        entity_id: Some(sale.id.clone()),
                        action: "sale.checkout",
                        changes: Some(serde_json::json!({
                            "receipt_number": sale.receipt_number,
                            "total_cents": sale.total_cents,
                            "lines": lines.len(),
                        })),
                        note,
                    },
                );
                ActionResult::ok("Sale completed", sale)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    /// Voids a completed sale and returns its units to stock.
    pub async fn void_sale(&self, sale_id: &str) -> ActionResult<Sale> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.void_inner(&user, sale_id).await {
            Ok(sale) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "sale",
                        entity_id: Some(sale.id.clone()),
                        action: "sale.void",
                        changes: Some(serde_json::json!({
                            "receipt_number": sale.receipt_number,
                        })),
                        note: None,
                    },
                );
                ActionResult::ok("Sale voided", sale)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn checkout_inner(
        &self,
        user: &AuthedUser,
        lines: &[CheckoutLine],
        note: Option<String>,
    ) -> EngineResult<Sale> {
        validation::validate_bulk_size("lines", lines.len())?;
        for line in lines {
            validation::validate_uuid("product_id", &line.product_id)?;
            validation::validate_quantity("quantity", line.quantity)?;
        }

        // Load every product up front: ownership check plus the price
        // and name snapshots frozen onto the sale lines.
        let mut products = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .db
                .products()
                .get(&user.tenant_id, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;
            products.push(product);
        }

        let now = Utc::now();
        let subtotal: i64 = lines
            .iter()
            .zip(&products)
            .map(|(line, product)| product.price_cents * line.quantity)
            .sum();

        let sale = Sale {
            id: generate_sale_id(),
            tenant_id: user.tenant_id.clone(),
            receipt_number: generate_receipt_number(),
            status: SaleStatus::Completed,
            subtotal_cents: subtotal,
            total_cents: subtotal,
            user_id: user.user_id.clone(),
            notes: note,
            created_at: now,
            completed_at: Some(now),
        };

        let mut tx = self.db.begin().await?;

        SaleRepository::insert_sale_tx(&mut tx, &sale).await?;

        for (line, product) in lines.iter().zip(&products) {
            // Guard against the transactional quantity; a sequence of
            // lines for the same product sees its own earlier decrements.
            let current = ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &product.id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &product.id))?;
            let next = guard::apply_delta(&product.sku, current, -line.quantity)?;
            ProductRepository::set_quantity_tx(&mut tx, &user.tenant_id, &product.id, next, now)
                .await?;

            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                line_total_cents: product.price_cents * line.quantity,
                created_at: now,
            };
            SaleRepository::insert_item_tx(&mut tx, &item).await?;

            let mut movement =
                Self::new_movement(user, &product.id, MovementType::Out, -line.quantity);
            movement.reference = Some(sale.receipt_number.clone());
            movement.reference_kind = Some(ReferenceKind::Sale);
            StockRepository::insert_movement_tx(&mut tx, &movement).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            total_cents = sale.total_cents,
            lines = lines.len(),
            "Sale completed"
        );

        Ok(sale)
    }

    async fn void_inner(&self, user: &AuthedUser, sale_id: &str) -> EngineResult<Sale> {
        validation::validate_uuid("sale_id", sale_id)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let sale = SaleRepository::get_tx(&mut tx, &user.tenant_id, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if sale.status != SaleStatus::Completed {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale.id.clone(),
                current_status: "voided".to_string(),
            }
            .into());
        }

        let items = SaleRepository::items_tx(&mut tx, &sale.id).await?;

        for item in &items {
            let current = ProductRepository::quantity_tx(&mut tx, &user.tenant_id, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &item.product_id))?;
            let next = guard::apply_delta("Product", current, item.quantity)?;
            ProductRepository::set_quantity_tx(
                &mut tx,
                &user.tenant_id,
                &item.product_id,
                next,
                now,
            )
            .await?;

            let mut movement =
                Self::new_movement(user, &item.product_id, MovementType::In, item.quantity);
            movement.reference = Some(sale.receipt_number.clone());
            movement.reference_kind = Some(ReferenceKind::Sale);
            StockRepository::insert_movement_tx(&mut tx, &movement).await?;
        }

        SaleRepository::set_status_tx(&mut tx, &user.tenant_id, &sale.id, SaleStatus::Voided)
            .await?;

        tx.commit().await?;

        info!(sale_id = %sale.id, receipt_number = %sale.receipt_number, "Sale voided");

        Ok(Sale {
            status: SaleStatus::Voided,
            ..sale
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_product, test_engine, TENANT};

    #[tokio::test]
    async fn checkout_decrements_stock_and_writes_out_movements() {
        let (engine, _audit) = test_engine().await;
        let coffee = seed_product(engine.db(), "COFFEE", 10).await;
        let filters = seed_product(engine.db(), "FILTERS", 50).await;

        let result = engine
            .checkout_sale(
                vec![
                    CheckoutLine {
                        product_id: coffee.id.clone(),
                        quantity: 2,
                    },
                    CheckoutLine {
                        product_id: filters.id.clone(),
                        quantity: 5,
                    },
                ],
                None,
            )
            .await;

        assert!(result.success, "{}", result.message);
        let sale = result.data.unwrap();
        // 2×500 + 5×500 from the seeded unit price
        assert_eq!(sale.total_cents, 3500);

        let stored_coffee = engine.db().products().get(TENANT, &coffee.id).await.unwrap().unwrap();
        assert_eq!(stored_coffee.quantity, 8);
        let stored_filters = engine.db().products().get(TENANT, &filters.id).await.unwrap().unwrap();
        assert_eq!(stored_filters.quantity, 45);

        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &coffee.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].quantity, -2);
        assert_eq!(
            movements[0].reference.as_deref(),
            Some(sale.receipt_number.as_str())
        );

        let items = engine.db().sales().items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn checkout_is_all_or_nothing_when_one_line_lacks_stock() {
        let (engine, _audit) = test_engine().await;
        let coffee = seed_product(engine.db(), "COFFEE", 10).await;
        let filters = seed_product(engine.db(), "FILTERS", 3).await;

        let result = engine
            .checkout_sale(
                vec![
                    CheckoutLine {
                        product_id: coffee.id.clone(),
                        quantity: 2,
                    },
                    CheckoutLine {
                        product_id: filters.id.clone(),
                        quantity: 4, // only 3 on hand
                    },
                ],
                None,
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.message, "Insufficient stock for FILTERS: short by 1");

        // First line's decrement rolled back with the rest.
        let stored_coffee = engine.db().products().get(TENANT, &coffee.id).await.unwrap().unwrap();
        assert_eq!(stored_coffee.quantity, 10);
        assert!(engine
            .db()
            .stock()
            .movements_for_product(TENANT, &coffee.id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn repeated_lines_for_one_product_are_guarded_cumulatively() {
        let (engine, _audit) = test_engine().await;
        let coffee = seed_product(engine.db(), "COFFEE", 5).await;

        let result = engine
            .checkout_sale(
                vec![
                    CheckoutLine {
                        product_id: coffee.id.clone(),
                        quantity: 3,
                    },
                    CheckoutLine {
                        product_id: coffee.id.clone(),
                        quantity: 3,
                    },
                ],
                None,
            )
            .await;

        // 3 + 3 > 5: the second line must see the first line's decrement.
        assert!(!result.success);
        let stored = engine.db().products().get(TENANT, &coffee.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 5);
    }

    #[tokio::test]
    async fn void_restores_stock_by_appending_in_movements() {
        let (engine, _audit) = test_engine().await;
        let coffee = seed_product(engine.db(), "COFFEE", 10).await;

        let sale = engine
            .checkout_sale(
                vec![CheckoutLine {
                    product_id: coffee.id.clone(),
                    quantity: 4,
                }],
                None,
            )
            .await
            .data
            .unwrap();

        let result = engine.void_sale(&sale.id).await;
        assert!(result.success, "{}", result.message);
        assert_eq!(result.data.unwrap().status, SaleStatus::Voided);

        let stored = engine.db().products().get(TENANT, &coffee.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);

        // Ledger grew by an `in` row; the original `out` row is intact.
        let movements = engine
            .db()
            .stock()
            .movements_for_product(TENANT, &coffee.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements.iter().map(|m| m.quantity).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn voiding_twice_is_rejected() {
        let (engine, _audit) = test_engine().await;
        let coffee = seed_product(engine.db(), "COFFEE", 10).await;

        let sale = engine
            .checkout_sale(
                vec![CheckoutLine {
                    product_id: coffee.id.clone(),
                    quantity: 1,
                }],
                None,
            )
            .await
            .data
            .unwrap();

        assert!(engine.void_sale(&sale.id).await.success);
        let second = engine.void_sale(&sale.id).await;

        assert!(!second.success);
        assert!(second.message.contains("cannot perform operation"));

        // Stock not double-restored.
        let stored = engine.db().products().get(TENANT, &coffee.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
    }
}
