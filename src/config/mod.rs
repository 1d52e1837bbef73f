//! Application configuration
//!
//! Settings persist as JSON in the platform data directory:
//!
//! - **Linux**: `~/.local/share/flowdash/config.json`
//! - **macOS**: `~/Library/Application Support/flowdash/config.json`
//! - **Windows**: `%APPDATA%\flowdash\config.json`
//!
//! A missing or unreadable file falls back to defaults matching the
//! shipped dashboard: 1 s polling, a 5 minute chart window, and the
//! two-cluster display bucket layout. The file persists settings only;
//! telemetry never touches disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DashError, Result};
use crate::feed::FeedConfig;
use crate::registry::BucketRules;

/// Application identifier for the data directory
pub const APP_ID: &str = "flowdash";

/// Config filename inside the app data directory
pub const CONFIG_FILE: &str = "config.json";

/// Backend API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the monitoring backend
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Optional bearer token; also settable at runtime from the auth banner
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 10,
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Poll cadence and chart window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Live poll interval in seconds (nominal 1)
    pub interval_secs: u64,

    /// Rolling chart window in minutes; also the backfill lookback
    pub history_minutes: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            history_minutes: 5,
        }
    }
}

/// Static site labels shown in the header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub unit_name: String,
    pub profile_info: String,
    pub site_name: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            unit_name: "Unit: XX".to_string(),
            profile_info: "10kW / 250kWh".to_string(),
            site_name: "Singapore".to_string(),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub site: SiteInfo,

    /// Display bucket classification for card widgets
    #[serde(default)]
    pub buckets: BucketRules,
}

impl AppConfig {
    /// Load from the default location, falling back to defaults on a
    /// missing or unreadable file
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load from an explicit path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(DashError::Json)
    }

    /// Save to an explicit path, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(DashError::Json)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Save to the default location
    pub fn save_default(&self) -> Result<()> {
        let path = config_path()
            .ok_or_else(|| DashError::Config("no app data directory available".to_string()))?;
        self.save(path)
    }

    /// Worker configuration derived from these settings
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            poll_interval: Duration::from_secs(self.poll.interval_secs.max(1)),
            history_minutes: self.poll.history_minutes.max(1),
            buckets: self.buckets.clone(),
        }
    }
}

/// The application data directory, if the platform exposes one
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Path of the config file in the default location
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}
