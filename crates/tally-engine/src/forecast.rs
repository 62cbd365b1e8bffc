//! # Demand Forecast Engine
//!
//! Read-only: aggregates completed-sale line items over a lookback
//! window, computes average daily sales per product, projects days
//! until stockout, and classifies the trend by comparing the two
//! halves of the window. Served through the tenant cache.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use tally_core::forecast::{average_daily, classify_trend, days_until_stockout, Trend};
use tally_core::ValidationError;

use crate::engine::StockEngine;
use crate::error::{EngineError, EngineResult};
use crate::result::ActionResult;
use crate::session::AuthedUser;

/// Demand profile for one product over the lookback window.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductForecast {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    /// Current on-hand quantity.
    pub quantity: i64,
    /// Units sold in the window.
    pub total_sold: i64,
    pub avg_daily_sales: f64,
    /// Projected days until stockout at the current rate; absent when
    /// there is no measurable sales rate.
    pub days_until_stockout: Option<f64>,
    pub trend: Trend,
}

impl StockEngine {
    /// Computes demand forecasts over the given lookback window.
    ///
    /// Only products with completed sales in the window appear; voided
    /// sales never count.
    pub async fn demand_forecast(&self, lookback_days: u32) -> ActionResult<Vec<ProductForecast>> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.demand_forecast_inner(&user, lookback_days).await {
            Ok(forecasts) => ActionResult::ok("Forecast computed", forecasts),
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn demand_forecast_inner(
        &self,
        user: &AuthedUser,
        lookback_days: u32,
    ) -> EngineResult<Vec<ProductForecast>> {
        if lookback_days == 0 {
            return Err(ValidationError::MustBePositive {
                field: "lookback_days".to_string(),
            }
            .into());
        }

        let cache_key = format!("demand_forecast:{lookback_days}");
        if let Some(cached) = self.cache.get(&user.tenant_id, &cache_key) {
            if let Ok(forecasts) = serde_json::from_value(cached) {
                debug!(tenant_id = %user.tenant_id, "Forecast served from cache");
                return Ok(forecasts);
            }
        }

        // Split the window into halves; an odd day count gives the
        // first half the extra day.
        let second_half_days = lookback_days / 2;
        let first_half_days = lookback_days - second_half_days;
        let now = Utc::now();
        let start = now - Duration::days(lookback_days as i64);
        let midpoint = now - Duration::days(second_half_days as i64);

        let aggregates = self
            .db
            .sales()
            .sales_aggregates(&user.tenant_id, start, midpoint)
            .await?;

        let mut forecasts = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let Some(product) = self
                .db
                .products()
                .get(&user.tenant_id, &aggregate.product_id)
                .await?
            else {
                continue;
            };

            let first_half = aggregate.total_quantity - aggregate.second_half_quantity;
            let avg = average_daily(aggregate.total_quantity, lookback_days);

            forecasts.push(ProductForecast {
                product_id: product.id,
                sku: product.sku,
                name: product.name,
                quantity: product.quantity,
                total_sold: aggregate.total_quantity,
                avg_daily_sales: avg,
                days_until_stockout: days_until_stockout(product.quantity, avg),
                trend: classify_trend(
                    average_daily(first_half, first_half_days),
                    average_daily(aggregate.second_half_quantity, second_half_days),
                ),
            });
        }

        // Products closest to stockout first; no-rate products last.
        forecasts.sort_by(|a, b| {
            match (a.days_until_stockout, b.days_until_stockout) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.name.cmp(&b.name),
            }
        });

        let value = serde_json::to_value(&forecasts)
            .map_err(|e| EngineError::Unexpected(e.to_string()))?;
        self.cache.put(&user.tenant_id, &cache_key, value);

        Ok(forecasts)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_completed_sale, seed_product, test_engine};

    #[tokio::test]
    async fn forecast_computes_rate_stockout_and_trend() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "COFFEE", 30).await;

        let now = Utc::now();
        // First half (days 16-30 back): 15 units. Second half: 30 units.
        seed_completed_sale(engine.db(), &product.id, 15, now - Duration::days(20)).await;
        seed_completed_sale(engine.db(), &product.id, 30, now - Duration::days(5)).await;

        let result = engine.demand_forecast(30).await;
        assert!(result.success, "{}", result.message);
        let forecasts = result.data.unwrap();
        assert_eq!(forecasts.len(), 1);

        let f = &forecasts[0];
        assert_eq!(f.total_sold, 45);
        // 45 units over 30 days
        assert!((f.avg_daily_sales - 1.5).abs() < 1e-9);
        // 30 on hand / 1.5 per day
        assert!((f.days_until_stockout.unwrap() - 20.0).abs() < 1e-9);
        // 1.0/day vs 2.0/day: well past the +20% band
        assert_eq!(f.trend, Trend::Increasing);
    }

    #[tokio::test]
    async fn sales_outside_the_window_are_ignored() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "COFFEE", 30).await;

        let now = Utc::now();
        seed_completed_sale(engine.db(), &product.id, 99, now - Duration::days(45)).await;

        let result = engine.demand_forecast(30).await;
        assert!(result.success);
        assert!(result.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stable_demand_is_classified_within_the_band() {
        let (engine, _audit) = test_engine().await;
        let product = seed_product(engine.db(), "COFFEE", 100).await;

        let now = Utc::now();
        // 15 units each half of a 30-day window.
        seed_completed_sale(engine.db(), &product.id, 15, now - Duration::days(20)).await;
        seed_completed_sale(engine.db(), &product.id, 15, now - Duration::days(5)).await;

        let forecasts = engine.demand_forecast(30).await.data.unwrap();
        assert_eq!(forecasts[0].trend, Trend::Stable);
    }

    #[tokio::test]
    async fn zero_lookback_is_a_validation_failure() {
        let (engine, _audit) = test_engine().await;

        let result = engine.demand_forecast(0).await;
        assert!(!result.success);
        assert!(result.errors.unwrap().contains_key("lookback_days"));
    }
}
