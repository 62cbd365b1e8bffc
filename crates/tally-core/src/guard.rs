//! # Quantity Invariant Guard
//!
//! The single rule every stock mutation passes through: **a resulting
//! quantity must be ≥ 0**.
//!
//! ## Where the Guard Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Guard Placement (per primitive)                       │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Re-read current quantity  ← inside the transaction, never a stale     │
//! │       │                       value from before it opened              │
//! │       ▼                                                                 │
//! │  guard::apply_delta(current, delta) ── Err → ROLLBACK, nothing written │
//! │       │ Ok(new)                                                         │
//! │       ▼                                                                 │
//! │  UPDATE counter, INSERT movement                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Running the check against a transactional read is what prevents two
//! concurrent decrements from both passing against a stale quantity and
//! jointly driving it negative.

use crate::error::{CoreError, CoreResult};

/// Applies a signed delta to a current quantity, enforcing the
/// non-negative invariant.
///
/// ## Arguments
/// * `entity` - Human-readable entity label for the error ("Product",
///   "Batch", "Stock at source location")
/// * `current` - Quantity read inside the mutating transaction
/// * `delta` - Signed change to apply
///
/// ## Returns
/// * `Ok(new_quantity)` - The resulting quantity, guaranteed ≥ 0
/// * `Err(CoreError::NegativeStock)` - Carrying the deficit amount
///
/// ## Example
/// ```rust
/// use tally_core::guard;
///
/// assert_eq!(guard::apply_delta("Product", 10, -4).unwrap(), 6);
/// assert!(guard::apply_delta("Product", 10, -15).is_err());
/// ```
pub fn apply_delta(entity: &str, current: i64, delta: i64) -> CoreResult<i64> {
    let next = current + delta;
    if next < 0 {
        return Err(CoreError::NegativeStock {
            entity: entity.to_string(),
            deficit: -next,
        });
    }
    Ok(next)
}

/// Validates an absolute target quantity against the invariant.
///
/// Used by flows that set a quantity outright (product import) rather
/// than applying a delta.
pub fn require_non_negative(entity: &str, target: i64) -> CoreResult<i64> {
    if target < 0 {
        return Err(CoreError::NegativeStock {
            entity: entity.to_string(),
            deficit: -target,
        });
    }
    Ok(target)
}

/// Checks that `available` covers `requested` without going negative.
///
/// The strict form used by transfers: the source location must hold at
/// least the requested quantity, no transient negatives allowed.
pub fn require_available(entity: &str, available: i64, requested: i64) -> CoreResult<()> {
    if available < requested {
        return Err(CoreError::NegativeStock {
            entity: entity.to_string(),
            deficit: requested - available,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta_positive() {
        assert_eq!(apply_delta("Product", 10, 5).unwrap(), 15);
        assert_eq!(apply_delta("Product", 0, 1).unwrap(), 1);
    }

    #[test]
    fn test_apply_delta_to_exactly_zero() {
        assert_eq!(apply_delta("Product", 10, -10).unwrap(), 0);
    }

    #[test]
    fn test_apply_delta_rejects_negative_result() {
        let err = apply_delta("Product", 10, -15).unwrap_err();
        match err {
            CoreError::NegativeStock { entity, deficit } => {
                assert_eq!(entity, "Product");
                assert_eq!(deficit, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_require_non_negative() {
        assert_eq!(require_non_negative("Product", 0).unwrap(), 0);
        assert_eq!(require_non_negative("Product", 7).unwrap(), 7);
        assert!(require_non_negative("Product", -1).is_err());
    }

    #[test]
    fn test_require_available_strict() {
        assert!(require_available("Stock at location", 5, 5).is_ok());
        assert!(require_available("Stock at location", 5, 6).is_err());

        let err = require_available("Stock at location", 2, 9).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Stock at location: short by 7"
        );
    }
}
