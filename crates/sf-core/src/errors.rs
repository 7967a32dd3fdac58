//! Cross-cutting error types for Studyflow.
//!
//! Domain-specific errors (e.g., `RemoteError`, `SyncError`) are defined in
//! their respective crates. A unified error is deferred to `sf-cli`, where all
//! crate errors converge into `anyhow`.

use thiserror::Error;

use crate::enums::{Route, WorkflowStep};

/// Errors that can be raised by any Studyflow crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A step name outside the workflow enumeration.
    #[error("Unknown workflow step: {0}")]
    UnknownStep(String),

    /// Navigation to a step that is not reachable from the study's progress.
    #[error("Illegal transition from {from} to {to} (redirect to {redirect})")]
    IllegalTransition {
        from: WorkflowStep,
        to: WorkflowStep,
        redirect: Route,
    },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),
}
