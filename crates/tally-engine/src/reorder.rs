//! # Reorder Suggestion Engine
//!
//! Read-only: compares current quantities against reorder configuration
//! and classifies urgency. Explicit rules win; products with only a
//! low-stock threshold get the default heuristic. Results are served
//! through the tenant cache and recomputed after any write.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use tally_core::reorder::{classify_urgency, default_suggested_quantity, Urgency};

use crate::engine::StockEngine;
use crate::error::{EngineError, EngineResult};
use crate::result::ActionResult;
use crate::session::AuthedUser;

const CACHE_KEY: &str = "reorder_suggestions";

/// One product that should be reordered.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReorderSuggestion {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    /// Current on-hand quantity.
    pub quantity: i64,
    /// The reorder point the quantity was compared against (explicit
    /// rule, or the low-stock threshold for rule-less products).
    pub reorder_point: i64,
    /// Units to order.
    pub suggested_quantity: i64,
    pub urgency: Urgency,
    pub preferred_supplier_id: Option<String>,
}

impl StockEngine {
    /// Computes reorder suggestions for the caller's tenant.
    ///
    /// Pure read: nothing is mutated, results may come from the cache.
    pub async fn reorder_suggestions(&self) -> ActionResult<Vec<ReorderSuggestion>> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.reorder_suggestions_inner(&user).await {
            Ok(suggestions) => ActionResult::ok("Reorder suggestions computed", suggestions),
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn reorder_suggestions_inner(
        &self,
        user: &AuthedUser,
    ) -> EngineResult<Vec<ReorderSuggestion>> {
        if let Some(cached) = self.cache.get(&user.tenant_id, CACHE_KEY) {
            if let Ok(suggestions) = serde_json::from_value(cached) {
                debug!(tenant_id = %user.tenant_id, "Reorder suggestions served from cache");
                return Ok(suggestions);
            }
        }

        let mut suggestions = Vec::new();

        // Explicit rules first.
        for rule in self.db.reorder_rules().active_rules(&user.tenant_id).await? {
            let Some(product) = self
                .db
                .products()
                .get(&user.tenant_id, &rule.product_id)
                .await?
            else {
                continue;
            };
            if !product.is_active {
                continue;
            }

            let urgency = classify_urgency(product.quantity, rule.reorder_point);
            if urgency == Urgency::Normal {
                continue;
            }

            suggestions.push(ReorderSuggestion {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                quantity: product.quantity,
                reorder_point: rule.reorder_point,
                suggested_quantity: rule.reorder_quantity,
                urgency,
                preferred_supplier_id: rule.preferred_supplier_id,
            });
        }

        // Threshold-only products: default heuristic, 2× threshold with
        // a floor of 10.
        for product in self
            .db
            .reorder_rules()
            .products_with_threshold_without_rule(&user.tenant_id)
            .await?
        {
            let threshold = product.low_stock_threshold.unwrap_or(0);
            let urgency = classify_urgency(product.quantity, threshold);
            if urgency == Urgency::Normal {
                continue;
            }

            suggestions.push(ReorderSuggestion {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                quantity: product.quantity,
                reorder_point: threshold,
                suggested_quantity: default_suggested_quantity(threshold),
                urgency,
                preferred_supplier_id: product.supplier_id,
            });
        }

        // Most urgent first, then alphabetical for a stable screen.
        suggestions.sort_by(|a, b| {
            let rank = |u: Urgency| match u {
                Urgency::Critical => 0,
                Urgency::Warning => 1,
                Urgency::Normal => 2,
            };
            rank(a.urgency).cmp(&rank(b.urgency)).then(a.name.cmp(&b.name))
        });

        let value = serde_json::to_value(&suggestions)
            .map_err(|e| EngineError::Unexpected(e.to_string()))?;
        self.cache.put(&user.tenant_id, CACHE_KEY, value);

        Ok(suggestions)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::adjust::AdjustStockInput;
    use crate::testutil::{seed_product, seed_product_for, seed_rule, test_engine, TENANT};

    #[tokio::test]
    async fn rules_classify_critical_warning_and_skip_normal() {
        let (engine, _audit) = test_engine().await;
        let empty = seed_product(engine.db(), "EMPTY", 0).await;
        let low = seed_product(engine.db(), "LOW", 6).await;
        let fine = seed_product(engine.db(), "FINE", 15).await;
        for p in [&empty, &low, &fine] {
            seed_rule(engine.db(), &p.id, 10, 25).await;
        }

        let result = engine.reorder_suggestions().await;
        assert!(result.success);
        let suggestions = result.data.unwrap();

        assert_eq!(suggestions.len(), 2);
        let by_sku = |sku: &str| suggestions.iter().find(|s| s.sku == sku);
        assert_eq!(by_sku("EMPTY").unwrap().urgency, Urgency::Critical);
        assert_eq!(by_sku("LOW").unwrap().urgency, Urgency::Warning);
        assert!(by_sku("FINE").is_none());
        assert_eq!(by_sku("EMPTY").unwrap().suggested_quantity, 25);
    }

    #[tokio::test]
    async fn threshold_only_products_use_default_heuristic() {
        let (engine, _audit) = test_engine().await;
        // threshold 4, quantity 2: ratio 0.5 -> critical, suggested 10
        seed_product_for(engine.db(), TENANT, "NO-RULE", 2, Some(4)).await;
        // threshold 8, quantity 8: warning, suggested 16
        seed_product_for(engine.db(), TENANT, "EDGE", 8, Some(8)).await;

        let result = engine.reorder_suggestions().await;
        let suggestions = result.data.unwrap();

        let by_sku = |sku: &str| suggestions.iter().find(|s| s.sku == sku).unwrap().clone();
        assert_eq!(by_sku("NO-RULE").urgency, Urgency::Critical);
        assert_eq!(by_sku("NO-RULE").suggested_quantity, 10);
        assert_eq!(by_sku("EDGE").urgency, Urgency::Warning);
        assert_eq!(by_sku("EDGE").suggested_quantity, 16);
    }

    #[tokio::test]
    async fn mutation_invalidates_cached_suggestions() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "SKU-A", 6).await;
        seed_rule(engine.db(), &product.id, 10, 25).await;

        let first = engine.reorder_suggestions().await.data.unwrap();
        assert_eq!(first[0].quantity, 6);

        // Restock past the reorder point; the cached list must not be
        // served stale.
        let adjusted = engine
            .adjust_stock(AdjustStockInput {
                product_id: product.id.clone(),
                delta: 20,
                note: None,
            })
            .await;
        assert!(adjusted.success);

        let second = engine.reorder_suggestions().await.data.unwrap();
        assert!(second.is_empty());
    }
}
