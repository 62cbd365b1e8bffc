//! # Repository Module
//!
//! Database repository implementations for the Tally stock engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern, Transactional Variant           │
//! │                                                                         │
//! │  Plain reads/inserts take &self and use the pool:                      │
//! │       db.products().get(tenant, id)                                    │
//! │                                                                         │
//! │  Mutation-participating methods are associated functions taking        │
//! │  &mut SqliteConnection, so the engine can compose several of them      │
//! │  inside ONE transaction:                                               │
//! │                                                                         │
//! │       let mut tx = db.begin().await?;                                  │
//! │       ProductRepository::quantity_tx(&mut tx, ...)                     │
//! │       ProductRepository::set_quantity_tx(&mut tx, ...)                 │
//! │       StockRepository::insert_movement_tx(&mut tx, ...)                │
//! │       tx.commit().await?;                                              │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place per aggregate                          │
//! │  • The all-or-nothing unit is visible at the call site                 │
//! │  • Counter re-reads demonstrably happen inside the writing tx          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookup and counters
//! - [`stock::StockRepository`] - Movement ledger + per-location stock
//! - [`batch::BatchRepository`] - Batch lots
//! - [`purchase_order::PurchaseOrderRepository`] - Orders and lines
//! - [`sale::SaleRepository`] - Sales, items, forecast aggregates
//! - [`location::LocationRepository`] / [`location::SupplierRepository`]
//! - [`reorder::ReorderRuleRepository`] - Reorder configuration
//! - [`activity::ActivityRepository`] - Best-effort audit trail

pub mod activity;
pub mod batch;
pub mod location;
pub mod product;
pub mod purchase_order;
pub mod reorder;
pub mod sale;
pub mod stock;
