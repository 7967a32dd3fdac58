//! Notifications broadcast by [`crate::SyncStore`].

use sf_core::enums::{SyncKind, SyncStatus, WorkflowStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Save status of one kind changed.
    StatusChanged {
        study_id: String,
        kind: SyncKind,
        status: SyncStatus,
        error: Option<String>,
    },
    /// A pushed value replaced the local one.
    RemoteApplied { study_id: String, kind: SyncKind },
    /// A pushed value was dropped because the kind is guarded.
    RemoteIgnored { study_id: String, kind: SyncKind },
    Navigated {
        study_id: String,
        from: WorkflowStep,
        to: WorkflowStep,
        backward: bool,
    },
    OwnerUpdated { owner_id: String, studies: usize },
    /// A subscription failed; edits are blocked.
    StoreError { message: String },
    StoreRecovered,
}
