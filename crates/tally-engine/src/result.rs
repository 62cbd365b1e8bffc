//! # Uniform Action Result
//!
//! The single shape every engine entry point returns to the CRUD/action
//! layer: `{ success, message, data?, errors? }`.
//!
//! ## Conversion Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error → Result Mapping                             │
//! │                                                                         │
//! │  Validation error  → success: false, message, errors: {field: [msg]}   │
//! │  Business error    → success: false, message (display string)          │
//! │  Unexpected error  → success: false, generic message;                  │
//! │                      full detail goes to the server log only           │
//! │                                                                         │
//! │  No raw error, stack trace or internal detail ever reaches the UI.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::error;
use ts_rs::TS;

use tally_core::CoreError;

use crate::error::EngineError;

/// Message surfaced for unexpected errors, with no internal detail.
const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Uniform result object consumed by the action layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    /// Whether the operation committed.
    pub success: bool,

    /// Short human-readable outcome message.
    pub message: String,

    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Per-field validation messages, present only for validation
    /// failures so the UI can highlight specific inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

impl<T> ActionResult<T> {
    /// Successful result with a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        ActionResult {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }

    /// Failure with a plain message.
    pub fn failure(message: impl Into<String>) -> Self {
        ActionResult {
            success: false,
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    /// Converts an internal engine error into the uniform shape.
    ///
    /// Unexpected errors are logged here with full detail; the caller
    /// only ever sees the generic message.
    pub(crate) fn from_err(err: EngineError) -> Self {
        match err {
            EngineError::Core(CoreError::Validation(v)) => {
                let mut errors: HashMap<String, Vec<String>> = HashMap::new();
                errors
                    .entry(v.field().to_string())
                    .or_default()
                    .push(v.to_string());

                ActionResult {
                    success: false,
                    message: v.to_string(),
                    data: None,
                    errors: Some(errors),
                }
            }

            EngineError::Core(core) => ActionResult::failure(core.to_string()),

            EngineError::Unexpected(detail) => {
                error!(detail = %detail, "Unexpected engine error");
                ActionResult::failure(GENERIC_FAILURE_MESSAGE)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
