//! Optimistic sync timing configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sf_core::enums::SyncKind;

/// Default guard window after a local write, in milliseconds.
const fn default_cooldown_ms() -> u64 {
    1_000
}

/// Default wait for a subscription's first document, in milliseconds.
const fn default_startup_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// How long after a local write incoming pushes for the same kind are
    /// ignored, so the write's own echo cannot revert newer edits.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Maximum wait for the initial document of a subscription.
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Per-kind debounce overrides, keyed by kind name (`assets`,
    /// `takeoff-state` or `takeoff_state`, ...). Unlisted kinds use their
    /// built-in window.
    #[serde(default)]
    pub debounce_ms: BTreeMap<String, u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            debounce_ms: BTreeMap::new(),
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    #[must_use]
    pub const fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Debounce window for `kind`, honoring overrides.
    #[must_use]
    pub fn debounce_for(&self, kind: SyncKind) -> Duration {
        let name = kind.as_str();
        let ms = self
            .debounce_ms
            .get(name)
            .or_else(|| self.debounce_ms.get(&name.replace('-', "_")))
            .copied()
            .unwrap_or_else(|| kind.default_debounce_ms());
        Duration::from_millis(ms)
    }
}
