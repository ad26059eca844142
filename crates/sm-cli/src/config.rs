//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sm_core::{EngineError, IngestPolicy, WorkingHoursPolicy};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Working window, breaks and availability constants.
    #[serde(default)]
    pub policy: WorkingHoursPolicy,

    /// Retransmission rule applied by `sm import`.
    #[serde(default)]
    pub ingest: IngestPolicy,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("day_start_seconds", &self.policy.day_start_seconds)
            .field("day_end_seconds", &self.policy.day_end_seconds)
            .field("breaks", &self.policy.breaks.len())
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("sm.db"),
            policy: WorkingHoursPolicy::default(),
            ingest: IngestPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // SM_DATABASE_PATH, SM_POLICY__MACHINE_DAILY_HOURS, ...
        figment = figment.merge(Env::prefixed("SM_").split("__"));

        figment.extract()
    }

    /// Rejects a working-hours policy the engine cannot use.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.policy.validate()
    }
}

/// Returns the platform-specific config directory for sm.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sm"))
}

/// Returns the platform-specific data directory for sm.
///
/// On Linux: `~/.local/share/sm`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sm"))
}
