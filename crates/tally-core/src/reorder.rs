//! # Reorder Suggestion Math
//!
//! Pure classification behind the reorder suggestion engine. The SQL that
//! gathers rules and quantities lives in tally-db; this module only
//! decides urgency and suggested quantities, so the cutoffs are testable
//! without a database.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Urgency
// =============================================================================

/// How urgently a product needs reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Out of stock, or at half the reorder point or below.
    Critical,
    /// At or below the reorder point.
    Warning,
    /// Above the reorder point.
    Normal,
}

/// Classifies urgency from the current quantity and the reorder point.
///
/// ## Cutoffs
/// ```text
/// quantity = 0                      → critical
/// quantity / reorder_point ≤ 0.5    → critical
/// quantity / reorder_point ≤ 1.0    → warning
/// otherwise                         → normal
/// ```
///
/// A non-positive reorder point cannot form a ratio; anything in stock
/// counts as normal then.
///
/// ## Example
/// ```rust
/// use tally_core::reorder::{classify_urgency, Urgency};
///
/// assert_eq!(classify_urgency(0, 10), Urgency::Critical);
/// assert_eq!(classify_urgency(6, 10), Urgency::Warning);
/// assert_eq!(classify_urgency(15, 10), Urgency::Normal);
/// ```
pub fn classify_urgency(quantity: i64, reorder_point: i64) -> Urgency {
    if quantity <= 0 {
        return Urgency::Critical;
    }
    if reorder_point <= 0 {
        return Urgency::Normal;
    }
    // Integer comparisons: qty/point <= 1/2  <=>  2*qty <= point
    if quantity * 2 <= reorder_point {
        Urgency::Critical
    } else if quantity <= reorder_point {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

/// Default suggested order quantity for products without an explicit
/// reorder rule: twice the low-stock threshold, minimum 10.
pub fn default_suggested_quantity(low_stock_threshold: i64) -> i64 {
    (low_stock_threshold * 2).max(10)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_stock_is_critical() {
        assert_eq!(classify_urgency(0, 10), Urgency::Critical);
        assert_eq!(classify_urgency(0, 0), Urgency::Critical);
    }

    #[test]
    fn test_ratio_cutoffs() {
        // ratio 0.5 exactly -> critical
        assert_eq!(classify_urgency(5, 10), Urgency::Critical);
        // ratio 0.6 -> warning
        assert_eq!(classify_urgency(6, 10), Urgency::Warning);
        // ratio 1.0 exactly -> warning
        assert_eq!(classify_urgency(10, 10), Urgency::Warning);
        // ratio 1.5 -> normal
        assert_eq!(classify_urgency(15, 10), Urgency::Normal);
    }

    #[test]
    fn test_nonpositive_reorder_point() {
        assert_eq!(classify_urgency(3, 0), Urgency::Normal);
        assert_eq!(classify_urgency(3, -5), Urgency::Normal);
    }

    #[test]
    fn test_default_suggested_quantity() {
        assert_eq!(default_suggested_quantity(3), 10);
        assert_eq!(default_suggested_quantity(5), 10);
        assert_eq!(default_suggested_quantity(8), 16);
        assert_eq!(default_suggested_quantity(0), 10);
    }
}
