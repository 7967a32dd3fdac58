//! Per-kind echo suppression.
//!
//! A guard is raised by every local edit. Until the latest edit has been
//! written, every push for that kind is ignored, however long the debounce
//! is. Once written, pushes are still ignored for `cooldown` after the write
//! so its own echo cannot roll the value back. A failed write leaves the
//! guard `unsynced`, which suppresses pushes until a write succeeds: the
//! local value is the only copy of the user's edit.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncGuard {
    pending: bool,
    unwritten: bool,
    last_write: Option<Instant>,
    unsynced: bool,
    generation: u64,
}

impl SyncGuard {
    /// Record a local edit. Returns the edit's generation.
    pub const fn mark_pending(&mut self, now: Instant) -> u64 {
        self.pending = true;
        self.unwritten = true;
        self.last_write = Some(now);
        self.generation += 1;
        self.generation
    }

    /// Restart the window without counting a new edit (a write is starting).
    pub const fn touch(&mut self, now: Instant) {
        self.last_write = Some(now);
    }

    /// Record a successful write of the value as of `generation`. Edits made
    /// after that generation stay unwritten.
    pub const fn mark_persisted(&mut self, now: Instant, generation: u64) {
        self.last_write = Some(now);
        self.unsynced = false;
        if self.generation == generation {
            self.unwritten = false;
        }
    }

    pub const fn mark_failed(&mut self) {
        self.unsynced = true;
    }

    /// Lower the guard if no edit happened since `generation`.
    pub const fn clear_pending(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.pending = false;
            true
        } else {
            false
        }
    }

    /// Whether a push arriving at `now` must be ignored.
    #[must_use]
    pub fn suppresses(&self, now: Instant, cooldown: Duration) -> bool {
        if self.unsynced || self.unwritten {
            return true;
        }
        self.pending
            && self
                .last_write
                .is_some_and(|at| now.saturating_duration_since(at) < cooldown)
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the latest edit has not reached the store yet.
    #[must_use]
    pub const fn is_unwritten(&self) -> bool {
        self.unwritten
    }

    #[must_use]
    pub const fn is_unsynced(&self) -> bool {
        self.unsynced
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}
