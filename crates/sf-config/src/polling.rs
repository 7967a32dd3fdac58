//! Job polling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_interval_ms() -> u64 {
    5_000
}

/// Ten minutes: long enough for a large photo set to be classified.
const fn default_max_duration_ms() -> u64 {
    600_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Delay between status checks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Total time allowed before the wait times out.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Halt after this many consecutive failed checks. Unset means errors
    /// never stop the loop; only the deadline does.
    #[serde(default)]
    pub max_consecutive_errors: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_duration_ms: default_max_duration_ms(),
            max_consecutive_errors: None,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}
