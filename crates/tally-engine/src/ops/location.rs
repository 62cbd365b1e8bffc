//! # Location Deletion
//!
//! The one location operation with a stock invariant: a location can
//! only be deleted while no product holds stock there. Zero-quantity
//! stock rows are swept away with the location.

use serde_json::json;
use tracing::info;

use tally_core::{validation, CoreError};
use tally_db::{LocationRepository, StockRepository};

use crate::audit::AuditEvent;
use crate::engine::StockEngine;
use crate::error::EngineResult;
use crate::result::ActionResult;
use crate::session::AuthedUser;

impl StockEngine {
    /// Deletes a location; rejected while any stock remains there.
    pub async fn delete_location(&self, location_id: &str) -> ActionResult<()> {
        let user = match self.require_user() {
            Ok(user) => user,
            Err(e) => return ActionResult::from_err(e),
        };

        match self.delete_location_inner(&user, location_id).await {
            Ok(()) => {
                self.finish_mutation(
                    &user,
                    AuditEvent {
                        entity_type: "location",
                        entity_id: Some(location_id.to_string()),
                        action: "location.delete",
                        changes: Some(json!({ "location_id": location_id })),
                        note: None,
                    },
                );
                ActionResult::ok("Location deleted", ())
            }
            Err(e) => ActionResult::from_err(e),
        }
    }

    async fn delete_location_inner(
        &self,
        user: &AuthedUser,
        location_id: &str,
    ) -> EngineResult<()> {
        validation::validate_uuid("location_id", location_id)?;

        let location = self
            .db
            .locations()
            .get(&user.tenant_id, location_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Location", location_id))?;

        let mut tx = self.db.begin().await?;

        // The guard counts inside the deleting transaction so a
        // concurrent transfer into the location cannot slip through.
        let located = StockRepository::located_total_tx(&mut tx, &location.id).await?;
        if located > 0 {
            return Err(CoreError::NotEmpty {
                entity: "Location".to_string(),
                quantity: located,
            }
            .into());
        }

        LocationRepository::delete_tx(&mut tx, &user.tenant_id, &location.id).await?;

        tx.commit().await?;

        info!(location_id = %location.id, name = %location.name, "Location deleted");

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
