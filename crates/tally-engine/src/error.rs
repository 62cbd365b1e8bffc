//! # Engine Error Type
//!
//! The single error type the engine works with internally. Business
//! errors from tally-core pass through typed; database errors are
//! mapped onto the business taxonomy where they correspond to one
//! (uniqueness → Duplicate, missing row → NotFound) and onto the
//! unexpected path otherwise.
//!
//! Nothing of this type ever crosses the engine boundary: every public
//! entry point converts it into the uniform [`crate::result::ActionResult`].

use thiserror::Error;

use tally_core::CoreError;
use tally_db::DbError;

/// Internal engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule violation or validation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Anything unanticipated: connection loss, corrupt rows, bugs.
    /// Logged with full detail server-side; callers see a generic
    /// message.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Raw sqlx errors (transaction begin/commit) route through DbError so
/// constraint violations keep their business-taxonomy mapping.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::from(DbError::from(err))
    }
}

impl From<tally_core::ValidationError> for EngineError {
    fn from(err: tally_core::ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::Core(CoreError::NotFound { entity, id }),
            DbError::UniqueViolation { field, value } => {
                EngineError::Core(CoreError::Duplicate { field, value })
            }
            other => EngineError::Unexpected(other.to_string()),
        }
    }
}

/// Result type for internal engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_unique_violation_maps_to_duplicate() {
        let err: EngineError = DbError::duplicate("batch_number", "LOT-7").into();
        match err {
            EngineError::Core(CoreError::Duplicate { field, value }) => {
                assert_eq!(field, "batch_number");
                assert_eq!(value, "LOT-7");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_db_not_found_maps_to_core_not_found() {
        let err: EngineError = DbError::not_found("Product", "p1").into();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_db_internal_maps_to_unexpected() {
        let err: EngineError = DbError::Internal("disk on fire".to_string()).into();
        assert!(matches!(err, EngineError::Unexpected(_)));
    }
}
