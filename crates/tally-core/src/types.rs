//! # Domain Types
//!
//! Core domain types used throughout the Tally stock engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  ProductStock   │   │ StockMovement   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  product_id     │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  location_id    │   │  movement_type  │       │
//! │  │  quantity ≥ 0   │   │  quantity ≥ 0   │   │  quantity (±)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Batch       │   │ PurchaseOrder   │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  batch_number   │   │  status machine │   │  receipt_number │       │
//! │  │  quantity ≥ 0   │   │  items          │   │  items          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, batch_number, order_number, ...) - human-readable
//!
//! ## Tenancy
//! Every top-level entity carries a `tenant_id`. All queries filter by it
//! and every mutation primitive verifies ownership before writing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::order_state::PurchaseOrderStatus;

// =============================================================================
// Product
// =============================================================================

/// A sellable/trackable item.
///
/// ## Quantity Invariant
/// `quantity` is the authoritative on-hand total across all locations and
/// is **never** negative. It is mutated exclusively through the engine's
/// transactional primitives; UI code paths never assign it directly.
///
/// ## Located vs Total Stock
/// Per-location quantities live in [`ProductStock`]. Their sum need not
/// equal `quantity`: stock that has not been put away at a location is
/// counted in the total only. See the divergence note on `ProductStock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Stock Keeping Unit - business identifier, unique per tenant.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.), unique per tenant when present.
    pub barcode: Option<String>,

    /// Display name.
    pub name: String,

    /// Optional category label.
    pub category: Option<String>,

    /// Preferred supplier, if any.
    pub supplier_id: Option<String>,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// On-hand quantity across all locations. Never negative.
    pub quantity: i64,

    /// Low-stock threshold; drives low-stock detection and the default
    /// reorder suggestion when no explicit rule exists.
    pub low_stock_threshold: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether on-hand quantity is at or below the low-stock
    /// threshold (always false when no threshold is set).
    pub fn is_low_stock(&self) -> bool {
        self.low_stock_threshold
            .map(|threshold| self.quantity <= threshold)
            .unwrap_or(false)
    }
}

// =============================================================================
// Location & Per-Location Stock
// =============================================================================

/// A physical or logical place stock can sit (store, warehouse, shelf).
///
/// Deletable only while no [`ProductStock`] row for it holds quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub tenant_id: String,
    /// Unique per tenant.
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Quantity of one product at one location.
///
/// Composite identity `(product_id, location_id)`; the row is created
/// lazily the first time stock lands at a location.
///
/// ## Divergence Note
/// The sum of a product's `ProductStock` rows need not equal
/// `Product.quantity`. The total counter and the located counters are
/// maintained independently: transfers move located stock without
/// touching the total, while adjust/receive/checkout move the total
/// without assigning a location. "Unlocated" stock (total minus located)
/// is therefore representable and legal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductStock {
    pub product_id: String,
    pub location_id: String,
    /// Quantity at this location. Never negative, not even transiently.
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement (the ledger)
// =============================================================================

/// Kind of stock movement.
///
/// A closed enumeration: unrecognized movement kinds cannot enter the
/// ledger, and aggregation code matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Stock entering the system (batch intake, sale void restock).
    In,
    /// Stock leaving the system (sale checkout).
    Out,
    /// Manual or batch-level correction, signed either way.
    Adjustment,
    /// Relocation between two locations; total stock unchanged.
    Transfer,
    /// Purchase-order receiving.
    Receive,
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::In => write!(f, "in"),
            MovementType::Out => write!(f, "out"),
            MovementType::Adjustment => write!(f, "adjustment"),
            MovementType::Transfer => write!(f, "transfer"),
            MovementType::Receive => write!(f, "receive"),
        }
    }
}

/// What a movement's `reference` string points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `reference` is a sale receipt number.
    Sale,
    /// `reference` is a purchase order number.
    PurchaseOrder,
    /// `reference` is the counterpart location id of a transfer.
    Transfer,
}

/// An immutable, append-only ledger entry.
///
/// ## The System of Record
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │  Every quantity change writes a movement in the SAME transaction:  │
/// │                                                                     │
/// │  adjust   → 1 row  (type: adjustment)                              │
/// │  transfer → 2 rows (−n at source, +n at destination)               │
/// │  receive  → 1 row per PO line (type: receive)                      │
/// │  checkout → 1 row per sale line (type: out)                        │
/// │                                                                     │
/// │  Product.quantity is a cached projection; replaying the movements  │
/// │  from zero must (in principle) reproduce it.                       │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Rows are created once and never updated. The only deletion path is
/// transitive: removing a zero-quantity batch removes its movements.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Location the movement applies to, for located movements.
    pub location_id: Option<String>,
    /// Batch the movement applies to, for batch-scoped movements.
    pub batch_id: Option<String>,
    pub movement_type: MovementType,
    /// Signed quantity delta. Positive for stock in, negative for out.
    pub quantity: i64,
    /// Business reference (receipt number, order number, counterpart
    /// location id), interpreted per `reference_kind`.
    pub reference: Option<String>,
    pub reference_kind: Option<ReferenceKind>,
    /// Free-text operator note.
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Batch
// =============================================================================

/// A lot of a product with its own quantity and cost.
///
/// Batch quantity changes flow through the engine and write movements
/// referencing the batch. Mirrors the product-level negative guard one
/// level down: quantity never goes below zero, and a batch is deletable
/// only at exactly zero.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Lot identifier, unique per product.
    pub batch_number: String,
    /// Units remaining in this batch. Never negative.
    pub quantity: i64,
    /// Acquisition cost per unit in cents, when known.
    pub cost_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub manufactured_date: Option<DateTime<Utc>>,
    /// Purchase order that created this batch, if received against one.
    pub purchase_order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the unit cost as Money, when known.
    #[inline]
    pub fn cost(&self) -> Option<Money> {
        self.cost_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier reference entity.
///
/// CRUD for suppliers lives upstream; the engine only needs the row for
/// tenant-scope checks on purchase orders and reorder rules.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub tenant_id: String,
    /// Unique per tenant.
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Purchase Order
// =============================================================================

/// An order to a supplier.
///
/// Status follows the state machine in [`crate::order_state`]; receiving
/// advances it as a side effect, explicit transitions (`place`, `cancel`)
/// go through the same table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub tenant_id: String,
    pub supplier_id: String,
    /// Business identifier, e.g. "PO-2026-0042". Unique per tenant.
    pub order_number: String,
    pub status: PurchaseOrderStatus,
    pub notes: Option<String>,
    /// Stamped when the order enters `ordered`.
    #[ts(as = "Option<String>")]
    pub ordered_at: Option<DateTime<Utc>>,
    /// Stamped when the order enters `received`.
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line on a purchase order.
///
/// `received_quantity` only ever grows, and never past
/// `ordered_quantity` (the over-receive guard). Cancellation does not
/// reverse already-received quantity.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    /// Catalog product this line restocks; free-form lines carry none.
    pub product_id: Option<String>,
    /// Item description as ordered.
    pub name: String,
    pub ordered_quantity: i64,
    pub received_quantity: i64,
    pub unit_cost_cents: Option<i64>,
}

impl PurchaseOrderItem {
    /// Units still outstanding on this line.
    #[inline]
    pub fn outstanding(&self) -> i64 {
        self.ordered_quantity - self.received_quantity
    }

    /// Whether the line has been fully received.
    #[inline]
    pub fn is_fully_received(&self) -> bool {
        self.received_quantity >= self.ordered_quantity
    }
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale has been paid and stock decremented.
    Completed,
    /// Sale was voided; stock has been returned.
    Voided,
}

/// A completed sale transaction.
///
/// Checkout is atomic: the sale row, its items, the stock decrements and
/// the `out` movements all commit together.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub receipt_number: String,
    pub status: SaleStatus,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    /// Cashier/user who completed the sale.
    pub user_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity sold.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Reorder Rule
// =============================================================================

/// Per-product reorder configuration.
///
/// Consumed read-only by the suggestion engine; never mutates stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReorderRule {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    /// Suggest reordering when quantity falls to or below this point.
    pub reorder_point: i64,
    /// How many units to suggest ordering.
    pub reorder_quantity: i64,
    pub preferred_supplier_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// A best-effort audit trail entry: who did what.
///
/// Written outside the mutation transaction by the activity logger;
/// a failed append never unwinds the committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityEntry {
    pub id: String,
    pub tenant_id: String,
    /// Owner of the affected data.
    pub user_id: String,
    /// The acting user, when different from the owner (admin acting on
    /// behalf of a tenant).
    pub actor_id: Option<String>,
    /// Entity kind label: "product", "batch", "purchase_order", ...
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Action label: "stock.adjust", "stock.transfer", "po.receive", ...
    pub action: String,
    /// JSON document describing the change, when captured.
    pub changes: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64, threshold: Option<i64>) -> Product {
        Product {
            id: "p1".to_string(),
            tenant_id: "t1".to_string(),
            sku: "SKU-1".to_string(),
            barcode: None,
            name: "Widget".to_string(),
            category: None,
            supplier_id: None,
            price_cents: 1099,
            quantity,
            low_stock_threshold: threshold,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_threshold() {
        assert!(product(3, Some(5)).is_low_stock());
        assert!(product(5, Some(5)).is_low_stock());
        assert!(!product(6, Some(5)).is_low_stock());
        assert!(!product(0, None).is_low_stock());
    }

    #[test]
    fn test_movement_type_display() {
        assert_eq!(MovementType::In.to_string(), "in");
        assert_eq!(MovementType::Adjustment.to_string(), "adjustment");
        assert_eq!(MovementType::Receive.to_string(), "receive");
    }

    #[test]
    fn test_po_item_outstanding() {
        let item = PurchaseOrderItem {
            id: "i1".to_string(),
            purchase_order_id: "po1".to_string(),
            product_id: None,
            name: "Beans".to_string(),
            ordered_quantity: 20,
            received_quantity: 12,
            unit_cost_cents: None,
        };
        assert_eq!(item.outstanding(), 8);
        assert!(!item.is_fully_received());
    }

    #[test]
    fn test_product_price_as_money() {
        assert_eq!(product(0, None).price().cents(), 1099);
    }
}
