//! # tally-core: Pure Business Logic for the Tally Stock Engine
//!
//! This crate is the **heart** of Tally. It contains every business rule
//! that governs stock quantities as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  CRUD / Action Layer (external)                 │   │
//! │  │     adjust forms ──► transfer dialog ──► PO receiving UI        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-engine                                 │   │
//! │  │    Transactional mutation primitives, audit log, read cache    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   guard   │  │order_state │  │ validation│  │   │
//! │  │   │  Product  │  │ stock >= 0│  │ PO status  │  │   rules   │  │   │
//! │  │   │ Movement  │  │           │  │  machine   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Batch, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`guard`] - The quantity invariant: stock never goes negative
//! - [`order_state`] - Purchase order status state machine
//! - [`reorder`] - Reorder suggestion math (urgency classification)
//! - [`forecast`] - Demand forecast math (daily rate, stockout, trend)
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Quantities**: Stock is counted in whole units (i64), money in cents
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod forecast;
pub mod guard;
pub mod money;
pub mod order_state;
pub mod reorder;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Product` instead of
// `use tally_core::types::Product`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order_state::PurchaseOrderStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted by a single bulk operation
/// (bulk adjust, bulk delete, product import).
///
/// ## Business Reason
/// Bulk operations are all-or-nothing inside one transaction; bounding
/// the line count bounds transaction size and lock duration.
pub const MAX_BULK_LINES: usize = 500;

/// Maximum quantity accepted for a single adjustment, transfer or
/// receive line.
///
/// ## Business Reason
/// Catches fat-finger input (e.g., a scanned barcode landing in the
/// quantity field) before it reaches the ledger.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;
