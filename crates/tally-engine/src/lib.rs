//! # tally-engine: The Stock Mutation Engine
//!
//! The library-level contract the surrounding CRUD/action layer
//! consumes in-process: transactional stock mutations over the ledger
//! store, best-effort audit logging, a tenant-scoped read cache, and
//! the read-only derived-state calculators.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Control Flow                                     │
//! │                                                                         │
//! │  CRUD action ──► StockEngine primitive                                 │
//! │                      │                                                  │
//! │                      ├── SessionProvider.require_user()               │
//! │                      ├── validate + ownership checks                  │
//! │                      ├── ONE TRANSACTION:                             │
//! │                      │     re-read counters → invariant guard →       │
//! │                      │     counter updates → ledger append(s) →       │
//! │                      │     parent status update                       │
//! │                      ├── COMMIT                                        │
//! │                      ├── ActivityLogger.record()   (fire-and-forget)  │
//! │                      └── ReadCache.invalidate_tenant()                │
//! │                                                                         │
//! │  Dashboard read ──► reorder_suggestions() / demand_forecast()          │
//! │                      └── cache hit, or SQL aggregate + pure math       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The `StockEngine` handle and shared primitive plumbing
//! - [`ops`] - The mutation primitives (adjust, transfer, batch, purchase, sale, bulk, location)
//! - [`reorder`] / [`forecast`] - Read-only derived-state calculators
//! - [`audit`] - Fire-and-forget activity logging (channel + worker)
//! - [`cache`] - Tenant-scoped read cache abstraction
//! - [`session`] - The authentication boundary
//! - [`result`] - The uniform `ActionResult` shape
//! - [`error`] - Internal error unification
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_db::{Database, DbConfig};
//! use tally_engine::{StockEngine, StaticSession};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let (engine, audit_worker) = StockEngine::new(db, Arc::new(session_provider));
//!
//! let result = engine.adjust_stock(AdjustStockInput {
//!     product_id,
//!     delta: -3,
//!     note: Some("cycle count".into()),
//! }).await;
//!
//! // On shutdown, drain queued audit entries:
//! audit_worker.shutdown().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod cache;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod ops;
pub mod reorder;
pub mod result;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use audit::{ActivityLogger, ActivityWorkerHandle, AuditEvent};
pub use cache::{MemoryCache, ReadCache};
pub use engine::StockEngine;
pub use error::{EngineError, EngineResult};
pub use forecast::ProductForecast;
pub use ops::adjust::AdjustStockInput;
pub use ops::batch::{BatchAdjustInput, NewBatchInput};
pub use ops::bulk::{BulkAdjustLine, ImportProductRow};
pub use ops::purchase::ReceiveLine;
pub use ops::sale::CheckoutLine;
pub use ops::transfer::{TransferInput, TransferOutcome};
pub use reorder::ReorderSuggestion;
pub use result::ActionResult;
pub use session::{AuthedUser, NoSession, SessionProvider, StaticSession};

// =============================================================================
// Engine-Level Tests
// =============================================================================
// Cross-cutting properties that do not belong to a single primitive.
