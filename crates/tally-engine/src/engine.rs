//! # StockEngine
//!
//! The handle the CRUD/action layer holds. Wires the database, the
//! session boundary, the read cache and the activity logger together;
//! the mutation primitives themselves live in [`crate::ops`] as
//! `impl StockEngine` blocks, the read-side calculators in
//! [`crate::reorder`] and [`crate::forecast`].
//!
//! ## Primitive Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Every mutation primitive follows this sequence              │
//! │                                                                         │
//! │  1. require_user()            → AuthenticationRequired on failure      │
//! │  2. validate input            → ValidationError, field-scoped          │
//! │  3. load referenced entities  → NotFound on miss or cross-tenant       │
//! │  4. BEGIN                                                              │
//! │       re-read counters, run guard, update counters,                    │
//! │       append movement(s), update parent status                         │
//! │     COMMIT                    → any error above rolls everything back  │
//! │  5. finish_mutation()         → audit (fire-and-forget) + cache drop   │
//! │  6. ActionResult              → typed success or converted failure     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use tally_core::{MovementType, StockMovement};
use tally_db::repository::stock::generate_movement_id;
use tally_db::Database;

use crate::audit::{ActivityLogger, ActivityWorkerHandle, AuditEvent};
use crate::cache::{MemoryCache, ReadCache};
use crate::error::EngineResult;
use crate::session::{AuthedUser, SessionProvider};

/// The transactional stock-mutation engine.
///
/// Cheap to clone; all state is shared handles.
#[derive(Clone)]
pub struct StockEngine {
    pub(crate) db: Database,
    pub(crate) sessions: Arc<dyn SessionProvider>,
    pub(crate) cache: Arc<dyn ReadCache>,
    pub(crate) audit: ActivityLogger,
}

impl StockEngine {
    /// Creates an engine with the default in-process read cache.
    ///
    /// Spawns the activity worker; must be called from within a Tokio
    /// runtime. The returned handle shuts the worker down gracefully.
    pub fn new(
        db: Database,
        sessions: Arc<dyn SessionProvider>,
    ) -> (Self, ActivityWorkerHandle) {
        Self::with_cache(db, sessions, Arc::new(MemoryCache::new()))
    }

    /// Creates an engine with a caller-provided read cache.
    pub fn with_cache(
        db: Database,
        sessions: Arc<dyn SessionProvider>,
        cache: Arc<dyn ReadCache>,
    ) -> (Self, ActivityWorkerHandle) {
        let (audit, handle) = ActivityLogger::spawn(db.clone());

        let engine = StockEngine {
            db,
            sessions,
            cache,
            audit,
        };

        (engine, handle)
    }

    /// Returns the underlying database handle.
    ///
    /// For read paths the engine does not own (plain CRUD listings).
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Resolves the authenticated caller.
    pub(crate) fn require_user(&self) -> EngineResult<AuthedUser> {
        Ok(self.sessions.require_user()?)
    }

    /// Post-commit bookkeeping shared by every primitive: fire the
    /// audit entry and drop the tenant's cached reads.
    ///
    /// Runs strictly after the transaction committed; nothing here can
    /// fail the mutation.
    pub(crate) fn finish_mutation(&self, user: &AuthedUser, event: AuditEvent) {
        debug!(action = %event.action, tenant_id = %user.tenant_id, "Mutation committed");
        self.audit.record(user, event);
        self.cache.invalidate_tenant(&user.tenant_id);
    }

    /// Builds a ledger row skeleton for the current tenant and instant.
    ///
    /// Callers fill in location/batch/reference fields as the movement
    /// requires before appending it inside their transaction.
    pub(crate) fn new_movement(
        user: &AuthedUser,
        product_id: &str,
        movement_type: MovementType,
        quantity: i64,
    ) -> StockMovement {
        StockMovement {
            id: generate_movement_id(),
            tenant_id: user.tenant_id.clone(),
            product_id: product_id.to_string(),
            location_id: None,
            batch_id: None,
            movement_type,
            quantity,
            reference: None,
            reference_kind: None,
            note: None,
            created_at: Utc::now(),
        }
    }
}
