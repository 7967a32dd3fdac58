//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_owner() -> String {
    String::from("local-user")
}

fn default_storage_dir() -> String {
    String::from(".studyflow/storage")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Owner identity used when none is given on the command line.
    #[serde(default = "default_owner")]
    pub default_owner: String,

    /// Root directory for the filesystem transfer backend.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_owner: default_owner(),
            storage_dir: default_storage_dir(),
        }
    }
}
