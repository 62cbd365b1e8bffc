//! # Activity Log Repository
//!
//! Append and read the best-effort audit trail.
//!
//! Appends are issued by the activity logger worker, outside the
//! mutation transactions. A failed append is the worker's problem to
//! log and swallow; nothing here participates in the primary commit.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::ActivityEntry;

const ENTRY_COLUMNS: &str = "id, tenant_id, user_id, actor_id, entity_type, entity_id, action, \
     changes, note, created_at";

/// Repository for activity log database operations.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends an activity entry.
    pub async fn append(&self, entry: &ActivityEntry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                id, tenant_id, user_id, actor_id, entity_type, entity_id,
                action, changes, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tenant_id)
        .bind(&entry.user_id)
        .bind(&entry.actor_id)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.changes)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists a tenant's most recent activity.
    pub async fn recent(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<ActivityEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM activity_log \
             WHERE tenant_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let entries = sqlx::query_as::<_, ActivityEntry>(&sql)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}

/// Generates a new activity entry ID.
pub fn generate_activity_id() -> String {
    Uuid::new_v4().to_string()
}
