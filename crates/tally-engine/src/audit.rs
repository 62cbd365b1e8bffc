//! # Activity Logger
//!
//! Best-effort, fire-and-forget audit logging of who did what.
//!
//! ## Two-Phase Effect
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Activity Logging Flow                                │
//! │                                                                         │
//! │  Mutation primitive                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT (primary transaction) ← audit plays no part in this            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  logger.record(entry) ── bounded channel ──► ActivityWorker            │
//! │       │                                           │                     │
//! │       │ channel full/closed?                      ▼                     │
//! │       │ warn! and move on                 INSERT INTO activity_log     │
//! │       ▼                                           │                     │
//! │  primitive returns success                        │ append failed?     │
//! │  regardless of audit fate                         ▼                     │
//! │                                            warn! and move on           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failure on either side of the channel is logged and swallowed; a
//! committed mutation is never unwound, and the caller never sees an
//! audit failure.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tally_core::ActivityEntry;
use tally_db::repository::activity::generate_activity_id;
use tally_db::Database;

use crate::session::AuthedUser;

/// Depth of the audit channel. Mutations outrunning the worker by this
/// much start dropping entries (with a warning) rather than blocking.
const AUDIT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Logger Handle
// =============================================================================

/// What a primitive reports after a committed mutation.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Entity kind label: "product", "batch", "purchase_order", ...
    pub entity_type: &'static str,
    pub entity_id: Option<String>,
    /// Action label: "stock.adjust", "stock.transfer", "po.receive", ...
    pub action: &'static str,
    /// JSON document describing the change.
    pub changes: Option<serde_json::Value>,
    pub note: Option<String>,
}

/// Cheap-to-clone sending side of the activity pipeline.
#[derive(Debug, Clone)]
pub struct ActivityLogger {
    tx: mpsc::Sender<ActivityEntry>,
}

impl ActivityLogger {
    /// Spawns the background worker and returns the logger plus a
    /// handle for graceful shutdown.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(db: Database) -> (Self, ActivityWorkerHandle) {
        let (tx, rx) = mpsc::channel(AUDIT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = ActivityWorker {
            db,
            rx,
            shutdown_rx,
        };
        let join = tokio::spawn(worker.run());

        (
            ActivityLogger { tx },
            ActivityWorkerHandle { shutdown_tx, join },
        )
    }

    /// Queues an audit entry. Never blocks, never fails the caller.
    pub fn record(&self, user: &AuthedUser, event: AuditEvent) {
        let entry = ActivityEntry {
            id: generate_activity_id(),
            tenant_id: user.tenant_id.clone(),
            user_id: user.user_id.clone(),
            actor_id: user.actor_id.clone(),
            entity_type: event.entity_type.to_string(),
            entity_id: event.entity_id,
            action: event.action.to_string(),
            changes: event.changes.map(|c| c.to_string()),
            note: event.note,
            created_at: Utc::now(),
        };

        if let Err(e) = self.tx.try_send(entry) {
            warn!(error = %e, "Dropping activity log entry (channel unavailable)");
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Handle for controlling the activity worker.
pub struct ActivityWorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl ActivityWorkerHandle {
    /// Triggers graceful shutdown and waits for queued entries to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.join.await;
    }
}

/// Drains the audit channel into the activity_log table.
struct ActivityWorker {
    db: Database,
    rx: mpsc::Receiver<ActivityEntry>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ActivityWorker {
    async fn run(mut self) {
        info!("Activity worker starting");

        loop {
            tokio::select! {
                maybe = self.rx.recv() => {
                    match maybe {
                        Some(entry) => self.append(entry).await,
                        // All senders gone; nothing left to log.
                        None => break,
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Activity worker shutting down");
                    break;
                }
            }
        }

        // Drain whatever is still queued before exiting.
        self.rx.close();
        while let Some(entry) = self.rx.recv().await {
            self.append(entry).await;
        }

        info!("Activity worker stopped");
    }

    /// Appends one entry; failure is logged and swallowed.
    async fn append(&self, entry: ActivityEntry) {
        debug!(
            action = %entry.action,
            entity_type = %entry.entity_type,
            "Appending activity entry"
        );

        if let Err(e) = self.db.activity().append(&entry).await {
            warn!(
                error = %e,
                action = %entry.action,
                "Failed to append activity entry (swallowed)"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
