//! # Purchase Order Operations
//!
//! Explicit status transitions (place, cancel) and the receive
//! primitive. Receiving is the only operation here that touches stock;
//! status recomputation happens inside the same transaction as the
//! counter updates, via the pure state machine.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use tally_core::order_state::{derive_receive_status, transition};
use tally_core::{
    guard, validation, CoreError, MovementType, PurchaseOrder, PurchaseOrderStatus, ReferenceKind,
};
use tally_db::{ProductRepository, PurchaseOrderRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::{EngineError, EngineResult};
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// One received line: how many units arrived for which order item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLine {
    pub item_id: String,
    /// Units received now; strictly positive.
    pub quantity: i64,
}

impl StockEngine {
    /// Moves a draft order to `ordered`, stamping the order date.
    pub async fn place_order(&self, order_id: &str) -> ActionResult<PurchaseOrder> {
        self.transition_order(order_id, PurchaseOrderStatus::Ordered, "po.place")
            .await
    }

    /// Cancels an order. Allowed from draft, ordered or partial; never
    /// reverses quantity that was already received.
    pub async fn cancel_order(&self, order_id: &str) -> ActionResult<PurchaseOrder> {
        self.transition_order(order_id, PurchaseOrderStatus::Cancelled, "po.cancel")
            .await
    }

    /// Receives units against an order's lines.
    ///
    /// Per line: rejected when `already_received + received > ordered`.
    /// On success the line counters grow, catalog-linked products gain
    /// stock, one `receive` movement per line lands in the ledger, and
    /// the order's status advances to `partial` or `received`.
    pub async fn receive_purchase_order(
        &self,
        order_id: &str,
        lines: Vec<ReceiveLine>,
    ) -> ActionResult<PurchaseOrder> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.receive_inner(&user, order_id, &lines).await {
            Ok(order) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "purchase_order",
                        entity_id: Some(order.id.clone()),
                        action: "po.receive",
                        changes: Some(serde_json::json!({
                            "lines": lines.len(),
                            "status": order.status.to_string(),
                        })),
                        note: None,
                    },
                );
                ActionResult::ok("Items received", order)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn transition_order(
        &self,
        order_id: &str,
        to: PurchaseOrderStatus,
        action: &'static str,
    ) -> ActionResult<PurchaseOrder> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.transition_order_inner(&user, order_id, to).await {
            Ok(order) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "purchase_order",
                        entity_id: Some(order.id.clone()),
                        action,
                        changes: Some(serde_json::json!({ "status": order.status.to_string() })),
                        note: None,
                    },
                );
                ActionResult::ok(format!("Order {}", order.status), order)
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn transition_order_inner(
        &self,
        user: &AuthedUser,
        order_id: &str,
        to: PurchaseOrderStatus,
    ) -> EngineResult<PurchaseOrder> {
        validation::validate_uuid("order_id", order_id)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let order = PurchaseOrderRepository::get_tx(&mut tx, &user.tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Purchase order", order_id))?;

        let next = transition(order.status, to)?;
        PurchaseOrderRepository::update_status_tx(&mut tx, &user.tenant_id, &order.id, next, now)
            .await?;

        tx.commit().await?;

        info!(order_id = %order.id, from = %order.status, to = %next, "Order status changed");

        self.db
            .purchase_orders()
            .get(&user.tenant_id, &order.id)
            .await?
            .ok_or_else(|| EngineError::Unexpected("order vanished after update".to_string()))
    }

    async fn receive_inner(
        &self,
        user: &AuthedUser,
        order_id: &str,
        lines: &[ReceiveLine],
    ) -> EngineResult<PurchaseOrder> {
        validation::validate_uuid("order_id", order_id)?;
        validation::validate_bulk_size("lines", lines.len())?;
        for line in lines {
            validation::validate_uuid("item_id", &line.item_id)?;
            validation::validate_quantity("quantity", line.quantity)?;
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let order = PurchaseOrderRepository::get_tx(&mut tx, &user.tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Purchase order", order_id))?;

        // Re-read line counters inside the transaction; the over-receive
        // guard must not run against pre-transaction state.
        let items = PurchaseOrderRepository::items_tx(&mut tx, &order.id).await?;

        // Fold duplicate lines per item, then pre-validate every guard
        // before applying anything.
        let mut requested: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            *requested.entry(line.item_id.as_str()).or_insert(0) += line.quantity;
        }

        for (item_id, quantity) in &requested {
            let item = items
                .iter()
                .find(|i| i.id == *item_id)
                .ok_or_else(|| CoreError::not_found("Purchase order item", *item_id))?;

            if item.received_quantity + quantity > item.ordered_quantity {
                return Err(CoreError::OverReceive {
                    item: item.name.clone(),
                    ordered: item.ordered_quantity,
                    already_received: item.received_quantity,
                    requested: *quantity,
                }
                .into());
            }
        }

        // Apply: line counters, product counters, ledger rows.
        for (item_id, quantity) in &requested {
            let item = items
                .iter()
                .find(|i| i.id == *item_id)
                .ok_or_else(|| CoreError::not_found("Purchase order item", *item_id))?;

            PurchaseOrderRepository::add_received_tx(&mut tx, &item.id, *quantity).await?;

            if let Some(product_id) = &item.product_id {
                let current = ProductRepository::quantity_tx(&mut tx, &user.tenant_id, product_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Product", product_id))?;
                let next = guard::apply_delta("Product", current, *quantity)?;
                ProductRepository::set_quantity_tx(&mut tx, &user.tenant_id, product_id, next, now)
                    .await?;

                let mut movement =
                    Self::new_movement(user, product_id, MovementType::Receive, *quantity);
                movement.reference = Some(order.order_number.clone());
                movement.reference_kind = Some(ReferenceKind::PurchaseOrder);
                StockRepository::insert_movement_tx(&mut tx, &movement).await?;
            }
        }

        // Recompute status from the updated counters and persist it in
        // the same transaction. A transition the table forbids (e.g.
        // receiving on a draft or cancelled order) rolls everything back.
        let derived = derive_receive_status(items.iter().map(|item| {
            let received = item.received_quantity + requested.get(item.id.as_str()).unwrap_or(&0);
            (item.ordered_quantity, received)
        }));

        if derived != order.status {
            let next = transition(order.status, derived)?;
            PurchaseOrderRepository::update_status_tx(
                &mut tx,
                &user.tenant_id,
                &order.id,
                next,
                now,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            lines = lines.len(),
            status = %derived,
            "Purchase order items received"
        );

        self.db
            .purchase_orders()
            .get(&user.tenant_id, &order.id)
            .await?
            .ok_or_else(|| EngineError::Unexpected("order vanished after receive".to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
