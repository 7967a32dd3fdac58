//! Batch upload configuration.

use serde::{Deserialize, Serialize};

/// Default number of files transferred at once.
const fn default_concurrency() -> usize {
    3
}

/// Default chunk size for the filesystem transfer backend (64 KiB).
const fn default_chunk_bytes() -> usize {
    64 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Maximum concurrent file transfers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Bytes copied between progress ticks.
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            chunk_bytes: default_chunk_bytes(),
        }
    }
}
