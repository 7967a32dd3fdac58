//! # sf-config
//!
//! Layered configuration loading for Studyflow using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`STUDYFLOW_*` prefix, `__` as separator)
//! 2. Project-level `.studyflow/config.toml`
//! 3. User-level `~/.config/studyflow/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `STUDYFLOW_SYNC__COOLDOWN_MS` -> `sync.cooldown_ms` and
//! `STUDYFLOW_SYNC__DEBOUNCE_MS__ASSETS` -> `sync.debounce_ms.assets`.
//!
//! # Usage
//!
//! ```no_run
//! use sf_config::StudyflowConfig;
//!
//! let config = StudyflowConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! println!("upload concurrency: {}", config.upload.concurrency);
//! ```

mod error;
mod general;
mod polling;
mod sync;
mod upload;

pub use error::ConfigError;
pub use general::GeneralConfig;
pub use polling::PollingConfig;
pub use sync::SyncConfig;
pub use upload::UploadConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use sf_core::enums::SyncKind;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StudyflowConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl StudyflowConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed or a value
    /// has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests and the CLI can layer extra providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".studyflow/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("STUDYFLOW_").split("__"))
    }

    /// Reject values the runtime cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.concurrency == 0 {
            return Err(invalid("upload.concurrency", "must be at least 1"));
        }
        if self.upload.chunk_bytes == 0 {
            return Err(invalid("upload.chunk_bytes", "must be at least 1"));
        }
        if self.polling.interval_ms == 0 {
            return Err(invalid("polling.interval_ms", "must be at least 1"));
        }
        if self.polling.max_duration_ms == 0 {
            return Err(invalid("polling.max_duration_ms", "must be at least 1"));
        }
        if self.polling.max_consecutive_errors == Some(0) {
            return Err(invalid(
                "polling.max_consecutive_errors",
                "must be at least 1 when set",
            ));
        }
        for key in self.sync.debounce_ms.keys() {
            let known = SyncKind::ALL
                .iter()
                .any(|kind| kind.as_str() == key || kind.as_str().replace('-', "_") == *key);
            if !known {
                return Err(invalid(
                    &format!("sync.debounce_ms.{key}"),
                    "not a sync kind",
                ));
            }
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("studyflow").join("config.toml"))
    }

    /// Load `.env` walking up from `CARGO_MANIFEST_DIR`, falling back to the
    /// current directory. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
