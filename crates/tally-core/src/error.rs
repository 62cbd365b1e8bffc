//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures (field-scoped)       │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-engine result (separate crate)                                  │
//! │  └── ActionResult     - Uniform shape the action layer sees            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ActionResult        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity name, deficit, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::order_state::PurchaseOrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are caught at
/// the engine boundary and translated to the uniform action result;
/// they never reach the UI as raw errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No authenticated user/tenant was resolvable for the call.
    ///
    /// ## When This Occurs
    /// - Session expired or absent
    /// - The session provider rejected the request
    #[error("Authentication required")]
    AuthenticationRequired,

    /// An entity is missing or belongs to another tenant.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist in the database
    /// - ID exists but is scoped to a different tenant (reported
    ///   identically so tenants cannot probe each other's ids)
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// An operation would drive a quantity below zero.
    ///
    /// ## When This Occurs
    /// - Adjusting a product by a delta larger than its on-hand quantity
    /// - Transferring more than a location holds
    /// - Shrinking a batch below zero
    ///
    /// ## User Workflow
    /// ```text
    /// Adjust quantity (delta: -15, on hand: 10)
    ///      │
    ///      ▼
    /// guard::apply_delta(10, -15)
    ///      │
    ///      ▼
    /// NegativeStock { entity: "Product", deficit: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock for Product: short by 5"
    /// ```
    #[error("Insufficient stock for {entity}: short by {deficit}")]
    NegativeStock { entity: String, deficit: i64 },

    /// Receiving more units than a purchase order line has outstanding.
    #[error(
        "Cannot receive {requested} for {item}: {already_received} of {ordered} already received"
    )]
    OverReceive {
        item: String,
        ordered: i64,
        already_received: i64,
        requested: i64,
    },

    /// Uniqueness violation (duplicate SKU, batch number, location name).
    #[error("Duplicate {field}: '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A purchase order status change not allowed by the transition table.
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    },

    /// Deleting a container that still holds stock (batch, location).
    #[error("Cannot delete {entity} with remaining stock ({quantity} on hand)")]
    NotEmpty { entity: String, quantity: i64 },

    /// A sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when already-parsed input fails a business-shape rule.
/// Each variant names the offending field so the action layer can build
/// a per-field message map for the UI.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Too many lines in a bulk operation.
    #[error("{field} must contain at most {max} lines")]
    TooManyLines { field: String, max: usize },
}

impl ValidationError {
    /// Returns the name of the field this error is scoped to.
    ///
    /// Used by the engine to build the `errors: { field: [messages] }`
    /// map in the uniform action result.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustBeNonZero { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::TooManyLines { field, .. } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_stock_message() {
        let err = CoreError::NegativeStock {
            entity: "Product".to_string(),
            deficit: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Product: short by 5"
        );
    }

    #[test]
    fn test_over_receive_message() {
        let err = CoreError::OverReceive {
            item: "Espresso Beans 1kg".to_string(),
            ordered: 20,
            already_received: 12,
            requested: 10,
        };
        assert_eq!(
            err.to_string(),
            "Cannot receive 10 for Espresso Beans 1kg: 12 of 20 already received"
        );
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::InvalidTransition {
            from: PurchaseOrderStatus::Received,
            to: PurchaseOrderStatus::Ordered,
        };
        assert_eq!(err.to_string(), "Cannot change status from received to ordered");
    }

    #[test]
    fn test_validation_field_accessor() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.field(), "sku");
        assert_eq!(err.to_string(), "sku is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
