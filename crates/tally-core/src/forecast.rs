//! # Demand Forecast Math
//!
//! Pure computations behind the demand/forecast engine: average daily
//! sales, projected days-until-stockout, and trend classification. The
//! aggregation of completed-sale line items over the lookback window is
//! SQL in tally-db; everything here is arithmetic on the aggregates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sales trend over the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Relative band within which first-half and second-half averages count
/// as the same trend: ±20%.
const TREND_BAND: f64 = 0.2;

/// Average units sold per day over a window.
///
/// A zero-length window has no rate.
pub fn average_daily(total_sold: i64, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }
    total_sold as f64 / window_days as f64
}

/// Projects days until stockout at the current daily rate.
///
/// ## Returns
/// * `Some(days)` - quantity divided by the daily rate
/// * `None` - no measurable sales rate; no projection possible
pub fn days_until_stockout(quantity: i64, avg_daily: f64) -> Option<f64> {
    if avg_daily <= f64::EPSILON {
        return None;
    }
    Some(quantity.max(0) as f64 / avg_daily)
}

/// Classifies the trend by comparing the second half of the window
/// against the first, with a ±20% band.
///
/// ```text
/// second > first × 1.2   → increasing
/// second < first × 0.8   → decreasing
/// otherwise              → stable
/// ```
///
/// With no first-half sales, any second-half sales count as increasing.
pub fn classify_trend(first_half_avg: f64, second_half_avg: f64) -> Trend {
    if first_half_avg <= f64::EPSILON {
        if second_half_avg > f64::EPSILON {
            return Trend::Increasing;
        }
        return Trend::Stable;
    }

    let ratio = second_half_avg / first_half_avg;
    if ratio > 1.0 + TREND_BAND {
        Trend::Increasing
    } else if ratio < 1.0 - TREND_BAND {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_daily() {
        assert_eq!(average_daily(30, 30), 1.0);
        assert_eq!(average_daily(45, 30), 1.5);
        assert_eq!(average_daily(10, 0), 0.0);
    }

    #[test]
    fn test_days_until_stockout() {
        assert_eq!(days_until_stockout(30, 1.5), Some(20.0));
        assert_eq!(days_until_stockout(0, 2.0), Some(0.0));
        assert_eq!(days_until_stockout(30, 0.0), None);
    }

    #[test]
    fn test_trend_band() {
        // 1.5 vs 2.0: ratio 1.33 -> increasing
        assert_eq!(classify_trend(1.5, 2.0), Trend::Increasing);
        // 2.0 vs 1.5: ratio 0.75 -> decreasing
        assert_eq!(classify_trend(2.0, 1.5), Trend::Decreasing);
        // 2.0 vs 2.3: ratio 1.15, inside the band -> stable
        assert_eq!(classify_trend(2.0, 2.3), Trend::Stable);
        // 2.0 vs 1.7: ratio 0.85, inside the band -> stable
        assert_eq!(classify_trend(2.0, 1.7), Trend::Stable);
    }

    #[test]
    fn test_trend_from_zero_baseline() {
        assert_eq!(classify_trend(0.0, 1.0), Trend::Increasing);
        assert_eq!(classify_trend(0.0, 0.0), Trend::Stable);
    }
}
