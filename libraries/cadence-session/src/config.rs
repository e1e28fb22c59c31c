/// Session configuration
use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, read from the working directory if present
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub access: AccessSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Input must be stable this long before a search is issued
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessSettings {
    /// How long gated actions wait for an undecided entitlement
    #[serde(default = "default_entitlement_timeout_ms")]
    pub entitlement_timeout_ms: u64,

    #[serde(default)]
    pub require_subscription_for_playback: bool,

    #[serde(default)]
    pub require_subscription_for_uploads: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    #[serde(default = "default_format")]
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// `SQLite` URL; records stay in memory when unset
    #[serde(default)]
    pub database_url: Option<String>,

    /// Directory for uploaded blobs; kept in memory when unset
    #[serde(default)]
    pub blob_dir: Option<PathBuf>,

    /// Prefix of public object URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl SessionConfig {
    /// Load configuration from a file and the environment
    ///
    /// Uses `path` if given, otherwise `cadence.toml` when it exists.
    /// `CADENCE_*` variables override file values, with `__` between
    /// section and key (e.g. `CADENCE_PLAYBACK__INITIAL_VOLUME=0.5`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if path.is_some() || config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Self::build(settings)
    }

    /// Load configuration from a single file, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::build(config::Config::builder().add_source(config::File::from(path)))
    }

    fn build(settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config = settings
            .build()
            .map_err(|e| SessionError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.playback.initial_volume) {
            return Err(SessionError::Config(format!(
                "initial volume must be between 0.0 and 1.0, got {}",
                self.playback.initial_volume
            )));
        }

        if self.search.quiet_period_ms == 0 {
            return Err(SessionError::Config(
                "search quiet period must be greater than zero".to_string(),
            ));
        }

        if self.playback.format.is_empty() {
            return Err(SessionError::Config("format hint must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.search.quiet_period_ms)
    }

    pub fn entitlement_timeout(&self) -> Duration {
        Duration::from_millis(self.access.entitlement_timeout_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            entitlement_timeout_ms: default_entitlement_timeout_ms(),
            require_subscription_for_playback: false,
            require_subscription_for_uploads: false,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            format: default_format(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            blob_dir: None,
            public_base_url: default_public_base_url(),
        }
    }
}

// Default values
fn default_quiet_period_ms() -> u64 {
    500
}

fn default_entitlement_timeout_ms() -> u64 {
    5_000
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_format() -> String {
    cadence_playback::DEFAULT_FORMAT.to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:54321".to_string()
}
