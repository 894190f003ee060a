//! Configuration file support for coachrun.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/coachrun/config.toml`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Local data configuration (outbox location)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Path of the JSONL outbox holding writes that failed to sync
    pub fn outbox_path(&self) -> PathBuf {
        self.data_dir.join("outbox.jsonl")
    }
}

/// Hosted platform connection
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PlatformConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`
    #[serde(default)]
    pub url: String,

    /// Public API key sent as `apikey`
    #[serde(default)]
    pub anon_key: String,

    /// Signed-in user's access token; falls back to the anon key
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Live workout runner tuning
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// How long before an appointment starts the workout may be opened
    #[serde(default = "default_early_access_minutes")]
    pub early_access_minutes: i64,

    /// Upper bound on history rows fetched for ghost prefill
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Pre-start countdown of the work timer
    #[serde(default = "default_countdown_seconds")]
    pub countdown_seconds: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            early_access_minutes: default_early_access_minutes(),
            history_limit: default_history_limit(),
            countdown_seconds: default_countdown_seconds(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("coachrun")
}

fn default_early_access_minutes() -> i64 {
    10
}

fn default_history_limit() -> usize {
    100
}

fn default_countdown_seconds() -> u32 {
    5
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("coachrun").join("config.toml")
    }
}
