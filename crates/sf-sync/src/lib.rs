//! # sf-sync
//!
//! Keeps a local, optimistically-updated copy of each study in step with the
//! remote document store.
//!
//! Local edits apply immediately and are written back after a per-kind
//! debounce. Remote pushes are reconciled kind by kind: a kind edited locally
//! ignores pushes until the edit is written and for a short guard window
//! after, so the echo of an older write cannot undo a newer edit.

pub mod error;
pub mod event;
pub mod guard;
pub mod job;
mod store;

pub use error::SyncError;
pub use event::SyncEvent;
pub use guard::SyncGuard;
pub use job::{JobOutcome, await_job};
pub use store::SyncStore;
