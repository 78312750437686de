//! Synchronisation settings, persisted as TOML, and tracing setup.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sync::ApplyOrder;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings shared by every descriptor write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Submission order for facets that do not dictate their own.
    #[serde(default)]
    pub default_order: ApplyOrder,
    /// Ask the store to reason between the write and read phases of
    /// [`Descriptor::write_inconsistency_safe`](crate::descriptor::Descriptor::write_inconsistency_safe).
    #[serde(default)]
    pub reason_after_write: bool,
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            default_order: ApplyOrder::default(),
            reason_after_write: false,
        }
    }
}

impl SyncConfig {
    /// Parse from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `config.log_filter`. Does nothing if a global subscriber is already set.
pub fn init_tracing(config: &SyncConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}
