use sf_core::enums::{Route, SyncKind, WorkflowStep};
use sf_core::errors::CoreError;
use sf_remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The target step is not reachable. `redirect` is where to go instead.
    #[error("Cannot navigate from {from} to {to}; redirect to {redirect}")]
    IllegalTransition {
        from: WorkflowStep,
        to: WorkflowStep,
        redirect: Route,
    },

    /// A write was rejected. The local value is kept.
    #[error("Failed to persist {kind} for study {study_id}: {source}")]
    Persistence {
        study_id: String,
        kind: SyncKind,
        source: RemoteError,
    },

    /// A subscription failed; edits are refused until it recovers.
    #[error("Sync blocked by subscription error: {0}")]
    Blocked(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("{0} only changes through workflow transitions")]
    ReservedKind(SyncKind),

    #[error("Study not loaded: {0}")]
    NotLoaded(String),

    #[error("Study not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} halted: {reason}")]
    JobHalted { job_id: String, reason: String },

    #[error(transparent)]
    Core(CoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<CoreError> for SyncError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::IllegalTransition { from, to, redirect } => {
                Self::IllegalTransition { from, to, redirect }
            }
            other => Self::Core(other),
        }
    }
}
